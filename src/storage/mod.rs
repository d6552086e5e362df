//! Session storage abstraction.
//!
//! A [`Storage`] keeps one `(state, data)` record per [`StorageKey`]. Data
//! values cross a serialization boundary ([`serde_json::Value`]), so typed
//! reads through [`StorageExt`] fail with
//! [`StorageError::TypeMismatch`] instead of coercing.
//!
//! Implementations must make every operation safe to call concurrently and
//! linearizable per key. Operations on different keys carry no ordering.

use crate::error::StorageError;
use crate::state::State;
use crate::strategy::StorageKey;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod memory;

pub use memory::MemoryStorage;

/// Backend holding session records.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Current state of the session; [`State::DEFAULT`] when nothing is stored.
    async fn get_state(&self, key: &StorageKey) -> Result<State, StorageError>;

    /// Overwrite the state, keeping the session's data.
    async fn set_state(&self, key: &StorageKey, state: State) -> Result<(), StorageError>;

    /// Return the session to [`State::DEFAULT`]. Data is dropped only when
    /// `clear_data` is set.
    async fn reset_state(&self, key: &StorageKey, clear_data: bool) -> Result<(), StorageError>;

    /// Upsert one data field. `None` (or a JSON `null`) deletes the field;
    /// deleting an absent field is a no-op.
    async fn update_data(
        &self,
        key: &StorageKey,
        field: &str,
        value: Option<Value>,
    ) -> Result<(), StorageError>;

    /// Raw value stored under `field`.
    async fn read_data(&self, key: &StorageKey, field: &str) -> Result<Value, StorageError>;

    /// Release the backend. The default does nothing.
    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Typed data access for every [`Storage`].
#[async_trait]
pub trait StorageExt: Storage {
    /// Read `field` and decode it as `T`.
    async fn data<T>(&self, key: &StorageKey, field: &str) -> Result<T, StorageError>
    where
        T: DeserializeOwned + Serialize + Send,
    {
        let value = self.read_data(key, field).await?;
        decode(field, value)
    }

    /// Encode `value` and store it under `field`.
    async fn set_data<T>(&self, key: &StorageKey, field: &str, value: &T) -> Result<(), StorageError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let value = encode(field, value)?;
        self.update_data(key, field, value).await
    }

    /// Delete `field`.
    async fn remove_data(&self, key: &StorageKey, field: &str) -> Result<(), StorageError> {
        self.update_data(key, field, None).await
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

/// Encode a typed value for storage. Values that serialize to `null`
/// become `None`, which deletes the field.
pub fn encode<T>(field: &str, value: &T) -> Result<Option<Value>, StorageError>
where
    T: Serialize + ?Sized,
{
    match serde_json::to_value(value) {
        Ok(Value::Null) => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(e) => Err(StorageError::InvalidValue {
            field: field.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Decode a stored value as `T`.
///
/// The decoded value must encode back to exactly the stored value, so lossy
/// numeric conversions (an integer read as `f64`) and structs that ignore
/// stored fields are rejected as [`StorageError::TypeMismatch`].
pub fn decode<T>(field: &str, value: Value) -> Result<T, StorageError>
where
    T: DeserializeOwned + Serialize,
{
    let expected = std::any::type_name::<T>();
    let found = value_kind(&value);
    let mismatch = |reason: &dyn std::fmt::Display| {
        tracing::warn!(
            field,
            expected,
            found,
            error = %reason,
            "Stored data does not match requested type"
        );
        StorageError::TypeMismatch {
            field: field.to_string(),
            expected,
            found,
        }
    };

    let decoded = <T as serde::Deserialize>::deserialize(&value).map_err(|e| mismatch(&e))?;
    match serde_json::to_value(&decoded) {
        Ok(reencoded) if reencoded == value => Ok(decoded),
        Ok(_) => Err(mismatch(&"value does not round-trip through the requested type")),
        Err(e) => Err(mismatch(&e)),
    }
}

/// Short name of a JSON value's kind, for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
