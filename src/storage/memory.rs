//! In-memory storage.
//!
//! Records live in a sharded [`DashMap`]. Each mutation takes the write lock
//! of the key's shard for the whole read-modify-write, so operations on one
//! key are linearizable while keys in other shards proceed in parallel.
//! Reads take the shard's read lock. Guards are never held across `.await`.
//!
//! Everything is dropped on shutdown.

use super::Storage;
use crate::error::StorageError;
use crate::state::State;
use crate::strategy::StorageKey;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

/// One session: current state plus auxiliary data.
#[derive(Debug, Clone, Default)]
struct Record {
    state: State,
    data: HashMap<String, Value>,
}

impl Record {
    fn update_data(&mut self, field: &str, value: Option<Value>) {
        match value {
            None | Some(Value::Null) => {
                self.data.remove(field);
            }
            Some(v) => {
                self.data.insert(field.to_string(), v);
            }
        }
    }
}

/// Concurrency-safe storage kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: DashMap<StorageKey, Record>,
    closed: AtomicBool,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions that have been written at least once.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no session has been written yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }

    /// Run `call` on the key's record under the shard write lock, creating
    /// an empty record if needed.
    ///
    /// The closed flag is checked again while the shard lock is held: `close`
    /// sets the flag before clearing, so a write that slipped past the first
    /// check either lands before the clear reaches its shard or is refused.
    fn modify(&self, key: &StorageKey, call: impl FnOnce(&mut Record)) -> Result<(), StorageError> {
        self.ensure_open()?;
        let entry = self.records.entry(*key);
        self.ensure_open()?;
        let mut record = entry.or_default();
        call(record.value_mut());
        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_state(&self, key: &StorageKey) -> Result<State, StorageError> {
        self.ensure_open()?;
        Ok(self
            .records
            .get(key)
            .map(|r| r.state.clone())
            .unwrap_or_default())
    }

    async fn set_state(&self, key: &StorageKey, state: State) -> Result<(), StorageError> {
        trace!(%key, %state, "Set state");
        self.modify(key, |r| r.state = state)
    }

    async fn reset_state(&self, key: &StorageKey, clear_data: bool) -> Result<(), StorageError> {
        trace!(%key, clear_data, "Reset state");
        self.modify(key, |r| {
            r.state = State::DEFAULT;
            if clear_data {
                r.data.clear();
            }
        })
    }

    async fn update_data(
        &self,
        key: &StorageKey,
        field: &str,
        value: Option<Value>,
    ) -> Result<(), StorageError> {
        trace!(%key, field, delete = value.is_none(), "Update data");
        self.modify(key, |r| r.update_data(field, value))
    }

    async fn read_data(&self, key: &StorageKey, field: &str) -> Result<Value, StorageError> {
        self.ensure_open()?;
        self.records
            .get(key)
            .and_then(|r| r.data.get(field).cloned())
            .ok_or_else(|| StorageError::NotFound {
                field: field.to_string(),
            })
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::Release);
        self.records.clear();
        Ok(())
    }
}
