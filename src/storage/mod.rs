//!
//! civic-connect storage module
//! ----------------------------
//! Every piece of portal state lives in a flat key/value store: one namespaced key
//! ("slot") per collection, each holding a full JSON-encoded snapshot. Callers do
//! read/modify/write of whole slots; there is no incremental update and no
//! cross-slot transaction.
//!
//! Key responsibilities:
//! - The `KvBackend` interface that the credential store and the portal collections
//!   are injected with.
//! - `KvStore`, an in-memory backend that can be write-through persisted to a
//!   single snapshot file.
//! - Typed JSON helpers that turn a malformed slot into `AppError::Corrupt`.
//!
//! Backends are shared as `SharedKv` (`Arc<dyn KvBackend>`).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, AppResult};

pub mod kv;
mod keys;

pub use keys::Keys;
pub use kv::{KvStore, PersistenceSettings, SnapshotFormat, StoreSettings};

/// Process-wide string key/value store.
///
/// Values are opaque strings; the JSON helpers below layer typed snapshots on top.
pub trait KvBackend: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: String) -> AppResult<()>;
    /// Remove a key. Returns true if it existed.
    fn remove(&self, key: &str) -> AppResult<bool>;
    /// Copy of the whole key space, ordered by key.
    fn snapshot(&self) -> BTreeMap<String, String>;
}

pub type SharedKv = Arc<dyn KvBackend>;

/// True if the slot holds any value at all (even a malformed one).
pub fn slot_exists(kv: &dyn KvBackend, key: &str) -> AppResult<bool> {
    Ok(kv.get(key)?.is_some())
}

/// Decode a slot, or `None` when the key is absent.
pub fn read_json<T: DeserializeOwned>(kv: &dyn KvBackend, key: &str) -> AppResult<Option<T>> {
    let Some(text) = kv.get(key)? else { return Ok(None); };
    serde_json::from_str::<T>(&text)
        .map(Some)
        .map_err(|e| AppError::corrupt("malformed_json".to_string(), format!("slot '{}': {}", key, e)))
}

/// Decode a slot, falling back to the type's default when absent (`[]` / `{}`).
pub fn read_json_or_default<T: DeserializeOwned + Default>(kv: &dyn KvBackend, key: &str) -> AppResult<T> {
    Ok(read_json(kv, key)?.unwrap_or_default())
}

/// Replace a slot with the JSON encoding of `value`.
pub fn write_json<T: Serialize + ?Sized>(kv: &dyn KvBackend, key: &str, value: &T) -> AppResult<()> {
    let text = serde_json::to_string(value)?;
    debug!(target: "civic::storage", "write slot='{}' bytes={}", key, text.len());
    kv.set(key, text)
}

#[cfg(test)]
pub(crate) mod failing;
