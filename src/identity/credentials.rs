//! Credential store: accounts, password digests and the session slot.
//!
//! Three slots are owned here: `users` (ordered accounts), `credentials`
//! (account id -> digest) and `user` (the active session). Every mutation
//! rewrites whole slots; validation always runs before the first write, so a
//! rejected call leaves storage untouched.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::account::{Account, Role};
use super::authorizer::{self, Action};
use super::digest::{self, PasswordDigest};
use super::ids::{self, IdAllocator};
use super::session::{SessionSlot, SessionState};
use crate::config::PortalConfig;
use crate::error::{AppError, AppResult, ValidationError};
use crate::storage::{read_json_or_default, slot_exists, write_json, KvBackend, Keys, SharedKv};

/// Ids "1".."4" are taken by the seeded demo accounts.
const DEMO_ACCOUNTS: [(&str, &str, &str, Role); 4] = [
    ("1", "Admin User", "admin@civic.com", Role::Admin),
    ("2", "John Citizen", "citizen@civic.com", Role::Citizen),
    ("3", "Mayor Smith", "politician@civic.com", Role::Politician),
    ("4", "Moderator", "moderator@civic.com", Role::Moderator),
];

pub type CredentialMap = BTreeMap<String, String>;

/// Password length in UTF-16 code units, the unit browser forms count in.
fn password_len(password: &str) -> usize { password.encode_utf16().count() }

pub struct CredentialStore {
    kv: SharedKv,
    keys: Keys,
    config: PortalConfig,
    digest: Box<dyn PasswordDigest>,
    ids: Box<dyn IdAllocator>,
    session_slot: SessionSlot,
    state: RwLock<SessionState>,
    loading: AtomicBool,
}

impl CredentialStore {
    /// Build a store over `kv`. It starts in the loading state until `bootstrap` runs.
    pub fn new(kv: SharedKv, config: PortalConfig) -> Self {
        let keys = Keys::new(config.namespace.clone());
        let digest = digest::for_scheme(config.digest);
        let ids = ids::for_scheme(config.ids, keys.seq(), DEMO_ACCOUNTS.len() as u64);
        let session_slot = SessionSlot::new(keys.session());
        Self {
            kv,
            keys,
            config,
            digest,
            ids,
            session_slot,
            state: RwLock::new(SessionState::Anonymous),
            loading: AtomicBool::new(true),
        }
    }

    pub fn with_digest(mut self, digest: Box<dyn PasswordDigest>) -> Self { self.digest = digest; self }
    pub fn with_ids(mut self, ids: Box<dyn IdAllocator>) -> Self { self.ids = ids; self }

    pub fn kv(&self) -> &dyn KvBackend { self.kv.as_ref() }
    pub fn keys(&self) -> &Keys { &self.keys }
    pub fn config(&self) -> &PortalConfig { &self.config }
    pub fn ids(&self) -> &dyn IdAllocator { self.ids.as_ref() }

    /// True until `bootstrap` has restored the persisted session.
    pub fn is_loading(&self) -> bool { self.loading.load(Ordering::Acquire) }

    pub fn session(&self) -> SessionState { self.state.read().clone() }

    /// The authenticated account, if any.
    pub fn current(&self) -> Option<Account> { self.state.read().account().cloned() }

    fn load_users(&self) -> AppResult<Vec<Account>> { read_json_or_default(self.kv(), &self.keys.users()) }
    fn load_credentials(&self) -> AppResult<CredentialMap> { read_json_or_default(self.kv(), &self.keys.credentials()) }

    fn require_session(&self) -> AppResult<Account> {
        self.current().ok_or_else(|| AppError::auth("not_authenticated".to_string(), "no active session".to_string()))
    }

    fn set_session(&self, account: &Account) -> AppResult<()> {
        let st = self.session_slot.issue(self.kv(), account)?;
        *self.state.write() = st;
        Ok(())
    }

    /// Restore the persisted session and seed demo accounts on first start.
    /// Returns true if demo accounts were written.
    pub fn bootstrap(&self) -> AppResult<bool> {
        let restored = self.session_slot.restore(self.kv())?;
        if let Some(a) = restored.account() {
            debug!(target: "civic::auth", "bootstrap: restored session user={}", a.id);
        }
        *self.state.write() = restored;

        let mut seeded = false;
        if self.config.seed_demo && !slot_exists(self.kv(), &self.keys.users())? {
            self.seed_demo_accounts()?;
            seeded = true;
        }
        self.loading.store(false, Ordering::Release);
        Ok(seeded)
    }

    fn seed_demo_accounts(&self) -> AppResult<()> {
        let hashed = self.digest.digest(&self.config.demo_password)?;
        let users: Vec<Account> = DEMO_ACCOUNTS
            .iter()
            .map(|(id, name, email, role)| Account::new(*id, *name, *email, *role))
            .collect();
        let creds: CredentialMap = users.iter().map(|u| (u.id.clone(), hashed.clone())).collect();
        write_json(self.kv(), &self.keys.credentials(), &creds)?;
        write_json(self.kv(), &self.keys.users(), &users)?;
        info!(target: "civic::auth", "seeded {} demo accounts in namespace '{}'", users.len(), self.keys.namespace());
        Ok(())
    }

    pub fn register(&self, name: &str, email: &str, password: &str, role: Role) -> AppResult<Account> {
        if name.trim().is_empty() { return Err(ValidationError::MissingField("name").into()); }
        if email.trim().is_empty() { return Err(ValidationError::MissingField("email").into()); }
        let mut users = self.load_users()?;
        if users.iter().any(|u| u.email == email) {
            return Err(ValidationError::EmailExists.into());
        }
        if password_len(password) < self.config.min_password_len {
            return Err(ValidationError::PasswordTooShort { min: self.config.min_password_len }.into());
        }
        if !role.self_assignable() {
            return Err(ValidationError::RoleNotAllowed(role.to_string()).into());
        }
        let mut creds = self.load_credentials()?;
        let hashed = self.digest.digest(password)?;
        let id = self.ids.next_id(self.kv())?;

        let account = Account::new(id, name, email, role);
        // Credential first: a digest without an account is inert, an account without one is locked out.
        let prev_creds = creds.clone();
        creds.insert(account.id.clone(), hashed);
        write_json(self.kv(), &self.keys.credentials(), &creds)?;
        users.push(account.clone());
        if let Err(e) = write_json(self.kv(), &self.keys.users(), &users) {
            if let Err(undo) = write_json(self.kv(), &self.keys.credentials(), &prev_creds) {
                warn!(target: "civic::auth", "register: could not drop credential for id={}: {}", account.id, undo);
            }
            return Err(e);
        }
        self.set_session(&account)?;
        info!(target: "civic::auth", "register user={} role={}", account.id, account.role);
        Ok(account)
    }

    /// `Ok(None)` covers both unknown email and wrong password.
    pub fn login(&self, email: &str, password: &str) -> AppResult<Option<Account>> {
        let users = self.load_users()?;
        let Some(found) = users.into_iter().find(|u| u.email == email) else {
            debug!(target: "civic::auth", "login: no match");
            return Ok(None);
        };
        let creds = self.load_credentials()?;
        match creds.get(&found.id) {
            Some(stored) if self.digest.verify(stored, password) => {
                self.set_session(&found)?;
                info!(target: "civic::auth", "login user={}", found.id);
                Ok(Some(found))
            }
            _ => {
                debug!(target: "civic::auth", "login: rejected user={}", found.id);
                Ok(None)
            }
        }
    }

    pub fn logout(&self) -> AppResult<()> {
        self.session_slot.clear(self.kv())?;
        *self.state.write() = SessionState::Anonymous;
        Ok(())
    }

    pub fn change_password(&self, current_password: &str, new_password: &str, confirm_password: &str) -> AppResult<()> {
        let me = self.require_session()?;
        if password_len(new_password) < self.config.min_password_len {
            return Err(ValidationError::PasswordTooShort { min: self.config.min_password_len }.into());
        }
        if new_password != confirm_password {
            return Err(ValidationError::PasswordMismatch.into());
        }
        let mut creds = self.load_credentials()?;
        let ok = creds.get(&me.id).map(|stored| self.digest.verify(stored, current_password)).unwrap_or(false);
        if !ok {
            return Err(ValidationError::IncorrectPassword.into());
        }
        creds.insert(me.id.clone(), self.digest.digest(new_password)?);
        write_json(self.kv(), &self.keys.credentials(), &creds)?;
        info!(target: "civic::auth", "password changed user={}", me.id);
        Ok(())
    }

    /// Edit the signed-in account's name and email.
    pub fn update_profile(&self, name: &str, email: &str) -> AppResult<Account> {
        let me = self.require_session()?;
        if name.trim().is_empty() { return Err(ValidationError::MissingField("name").into()); }
        if email.trim().is_empty() { return Err(ValidationError::MissingField("email").into()); }
        let mut users = self.load_users()?;
        if users.iter().any(|u| u.email == email && u.id != me.id) {
            return Err(ValidationError::EmailExists.into());
        }
        let Some(entry) = users.iter_mut().find(|u| u.id == me.id) else {
            return Err(AppError::not_found("account_not_found".to_string(), format!("account '{}' no longer exists", me.id)));
        };
        entry.name = name.to_string();
        entry.email = email.to_string();
        let updated = entry.clone();
        write_json(self.kv(), &self.keys.users(), &users)?;
        self.set_session(&updated)?;
        info!(target: "civic::auth", "profile updated user={}", updated.id);
        Ok(updated)
    }

    pub fn list_accounts(&self) -> AppResult<Vec<Account>> { self.load_users() }

    pub fn find_account(&self, id: &str) -> AppResult<Option<Account>> {
        Ok(self.load_users()?.into_iter().find(|u| u.id == id))
    }

    /// Admin-only role change. The session slot follows if it holds the same account.
    pub fn set_role(&self, actor: &Account, account_id: &str, role: Role) -> AppResult<Account> {
        authorizer::require(actor, Action::ManageUsers)?;
        let mut users = self.load_users()?;
        let Some(entry) = users.iter_mut().find(|u| u.id == account_id) else {
            return Err(AppError::not_found("account_not_found".to_string(), format!("no account '{}'", account_id)));
        };
        entry.role = role;
        let updated = entry.clone();
        write_json(self.kv(), &self.keys.users(), &users)?;
        if self.current().map(|a| a.id == updated.id).unwrap_or(false) {
            self.set_session(&updated)?;
        }
        info!(target: "civic::auth", "role changed user={} role={} by={}", updated.id, updated.role, actor.id);
        Ok(updated)
    }

    /// Drop an account together with its credential record, and the session if it
    /// holds that account. Authorization and dependent-record cleanup are the caller's job.
    pub(crate) fn remove_account(&self, account_id: &str) -> AppResult<Account> {
        let mut users = self.load_users()?;
        let Some(pos) = users.iter().position(|u| u.id == account_id) else {
            return Err(AppError::not_found("account_not_found".to_string(), format!("no account '{}'", account_id)));
        };
        let removed = users.remove(pos);
        let mut creds = self.load_credentials()?;
        creds.remove(account_id);
        write_json(self.kv(), &self.keys.users(), &users)?;
        write_json(self.kv(), &self.keys.credentials(), &creds)?;
        if self.current().map(|a| a.id == removed.id).unwrap_or(false) {
            self.logout()?;
        }
        Ok(removed)
    }

    /// Whether a credential record exists for the account.
    pub fn has_credential(&self, account_id: &str) -> AppResult<bool> {
        Ok(self.load_credentials()?.contains_key(account_id))
    }
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod credentials_tests;
