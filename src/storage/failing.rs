//! Test backend that rejects writes to chosen slots, for exercising partial-failure paths.

use std::collections::{BTreeMap, HashSet};

use parking_lot::Mutex;

use super::{KvBackend, KvStore};
use crate::error::{AppError, AppResult};

pub(crate) struct FailingKv {
    inner: KvStore,
    fail_on: Mutex<HashSet<String>>,
}

impl FailingKv {
    pub(crate) fn new() -> Self {
        Self { inner: KvStore::in_memory("failing"), fail_on: Mutex::new(HashSet::new()) }
    }

    /// Every later `set`/`remove` of `key` fails with an io error.
    pub(crate) fn fail_writes_to(&self, key: &str) { self.fail_on.lock().insert(key.to_string()); }

    pub(crate) fn heal(&self) { self.fail_on.lock().clear(); }

    fn check(&self, key: &str) -> AppResult<()> {
        if self.fail_on.lock().contains(key) {
            return Err(AppError::io("io_error".to_string(), format!("disk full writing '{}'", key)));
        }
        Ok(())
    }
}

impl KvBackend for FailingKv {
    fn get(&self, key: &str) -> AppResult<Option<String>> { self.inner.get(key) }

    fn set(&self, key: &str, value: String) -> AppResult<()> {
        self.check(key)?;
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> AppResult<bool> {
        self.check(key)?;
        self.inner.remove(key)
    }

    fn snapshot(&self) -> BTreeMap<String, String> { self.inner.snapshot() }
}
