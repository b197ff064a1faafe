use tracing::debug;

use super::account::Account;
use crate::error::AppResult;
use crate::storage::{read_json, write_json, KvBackend};

/// Who is signed in for this store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Account),
}

impl SessionState {
    pub fn account(&self) -> Option<&Account> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(a) => Some(a),
        }
    }

    pub fn is_authenticated(&self) -> bool { matches!(self, SessionState::Authenticated(_)) }
}

/// The single persisted session slot: one account, or nothing.
#[derive(Debug, Clone)]
pub struct SessionSlot {
    key: String,
}

impl SessionSlot {
    pub fn new(key: impl Into<String>) -> Self { Self { key: key.into() } }

    /// Read back the persisted session; used at bootstrap.
    pub fn restore(&self, kv: &dyn KvBackend) -> AppResult<SessionState> {
        Ok(match read_json::<Account>(kv, &self.key)? {
            Some(a) => SessionState::Authenticated(a),
            None => SessionState::Anonymous,
        })
    }

    pub fn issue(&self, kv: &dyn KvBackend, account: &Account) -> AppResult<SessionState> {
        write_json(kv, &self.key, account)?;
        debug!(target: "civic::auth", "session.issue user={}", account.id);
        Ok(SessionState::Authenticated(account.clone()))
    }

    pub fn clear(&self, kv: &dyn KvBackend) -> AppResult<bool> {
        let removed = kv.remove(&self.key)?;
        debug!(target: "civic::auth", "session.clear removed={}", removed);
        Ok(removed)
    }
}
