use uuid::Uuid;

use crate::config::IdScheme;
use crate::error::{AppError, AppResult};
use crate::storage::{read_json, write_json, KvBackend};

/// Hands out record identifiers for accounts, issues, responses, updates and posts.
pub trait IdAllocator: Send + Sync {
    fn next_id(&self, kv: &dyn KvBackend) -> AppResult<String>;
}

/// Random UUID v4; needs no storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdAllocator for UuidIds {
    fn next_id(&self, _kv: &dyn KvBackend) -> AppResult<String> { Ok(Uuid::new_v4().to_string()) }
}

/// Monotonic counter kept in a storage slot.
#[derive(Debug, Clone)]
pub struct CounterIds {
    slot: String,
    /// Values at or below this are reserved (the seeded demo ids)
    floor: u64,
}

impl CounterIds {
    pub fn new(slot: impl Into<String>, floor: u64) -> Self { Self { slot: slot.into(), floor } }
}

impl IdAllocator for CounterIds {
    fn next_id(&self, kv: &dyn KvBackend) -> AppResult<String> {
        let cur: u64 = read_json(kv, &self.slot)?.unwrap_or(0);
        let next = cur.max(self.floor).checked_add(1)
            .ok_or_else(|| AppError::internal("id_exhausted".to_string(), format!("counter '{}' overflowed", self.slot)))?;
        write_json(kv, &self.slot, &next)?;
        Ok(next.to_string())
    }
}

pub fn for_scheme(scheme: IdScheme, seq_slot: String, floor: u64) -> Box<dyn IdAllocator> {
    match scheme {
        IdScheme::Uuid => Box::new(UuidIds),
        IdScheme::Counter => Box::new(CounterIds::new(seq_slot, floor)),
    }
}
