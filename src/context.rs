//! Per-event session accessor.
//!
//! A [`Context`] is the storage API with the key already bound. The manager
//! builds one per inbound event through a [`ContextFactory`]; handlers and
//! the dispatcher only ever talk to state through it, so an alternative
//! implementation (write batching, request-scoped caching over a remote
//! store) can be swapped in without touching dispatch.
//!
//! Contexts are cheap, disposable views. Keep the [`Storage`], not the context.

use crate::error::StorageError;
use crate::state::State;
use crate::storage::{Storage, decode, encode};
use crate::strategy::StorageKey;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Session operations bound to one [`StorageKey`].
#[async_trait]
pub trait Context: Send + Sync {
    /// Key of the session this context is bound to.
    fn key(&self) -> StorageKey;

    /// Current state.
    async fn state(&self) -> Result<State, StorageError>;

    /// Move the session to `state`.
    async fn set_state(&self, state: State) -> Result<(), StorageError>;

    /// Return to the default state, dropping data if `with_data` is set.
    async fn reset_state(&self, with_data: bool) -> Result<(), StorageError>;

    /// Upsert or delete (`None`) one data field.
    async fn update_data(&self, field: &str, value: Option<Value>) -> Result<(), StorageError>;

    /// Raw value stored under `field`.
    async fn data_value(&self, field: &str) -> Result<Value, StorageError>;
}

/// Typed helpers for every [`Context`].
#[async_trait]
pub trait ContextExt: Context {
    /// Read `field` as `T`.
    async fn data<T>(&self, field: &str) -> Result<T, StorageError>
    where
        T: DeserializeOwned + Serialize + Send,
    {
        let value = self.data_value(field).await?;
        decode(field, value)
    }

    /// Store `value` under `field`.
    async fn set_data<T>(&self, field: &str, value: &T) -> Result<(), StorageError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let value = encode(field, value)?;
        self.update_data(field, value).await
    }

    /// Delete `field`.
    async fn remove_data(&self, field: &str) -> Result<(), StorageError> {
        self.update_data(field, None).await
    }

    /// Read `field` as `T`, treating a missing field as `None`.
    async fn data_opt<T>(&self, field: &str) -> Result<Option<T>, StorageError>
    where
        T: DeserializeOwned + Serialize + Send,
    {
        match self.data(field).await {
            Ok(v) => Ok(Some(v)),
            Err(StorageError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<C: Context + ?Sized> ContextExt for C {}

/// Builds the context for one event.
pub type ContextFactory = Arc<dyn Fn(Arc<dyn Storage>, StorageKey) -> Box<dyn Context> + Send + Sync>;

/// The factory used when none is configured.
pub fn default_context_factory() -> ContextFactory {
    Arc::new(|storage: Arc<dyn Storage>, key: StorageKey| -> Box<dyn Context> {
        Box::new(StorageContext::new(storage, key))
    })
}

/// Default [`Context`]: forwards every call to the storage with its key.
#[derive(Clone)]
pub struct StorageContext {
    storage: Arc<dyn Storage>,
    key: StorageKey,
}

impl StorageContext {
    /// Bind `storage` to `key`.
    pub fn new(storage: Arc<dyn Storage>, key: StorageKey) -> Self {
        Self { storage, key }
    }

    /// The underlying storage.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }
}

impl std::fmt::Debug for StorageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageContext")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Context for StorageContext {
    fn key(&self) -> StorageKey {
        self.key
    }

    async fn state(&self) -> Result<State, StorageError> {
        self.storage.get_state(&self.key).await
    }

    async fn set_state(&self, state: State) -> Result<(), StorageError> {
        self.storage.set_state(&self.key, state).await
    }

    async fn reset_state(&self, with_data: bool) -> Result<(), StorageError> {
        self.storage.reset_state(&self.key, with_data).await
    }

    async fn update_data(&self, field: &str, value: Option<Value>) -> Result<(), StorageError> {
        self.storage.update_data(&self.key, field, value).await
    }

    async fn data_value(&self, field: &str) -> Result<Value, StorageError> {
        self.storage.read_data(&self.key, field).await
    }
}
