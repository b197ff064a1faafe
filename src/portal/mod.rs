//! Portal collections layered over the credential store: issue board, update
//! feed, crowdfunding posts, dashboard counters and account administration.
//! Each collection is an independent full-snapshot slot; the only cross-slot
//! operation is account deletion, which cascades.

use serde::Serialize;
use tracing::info;

use crate::config::PortalConfig;
use crate::error::{AppError, AppResult, ValidationError};
use crate::identity::authorizer::{self, Action};
use crate::identity::{Account, CredentialStore};
use crate::storage::SharedKv;

pub mod model;
mod issues;
mod updates;
mod crowdfund;
mod dashboard;

pub use model::{CrowdfundPost, Issue, IssueResponse, IssueStatus, NewIssue, Update};
pub use issues::IssueBoard;
pub use updates::UpdateFeed;
pub use crowdfund::CrowdfundBoard;
pub use dashboard::DashboardStats;

/// What `Portal::delete_account` removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub account: Account,
    pub issues_removed: usize,
    pub updates_removed: usize,
}

pub struct Portal {
    auth: CredentialStore,
}

impl Portal {
    /// Build over `kv` and run bootstrap (session restore + first-start seeding).
    pub fn open(kv: SharedKv, config: PortalConfig) -> AppResult<Self> {
        let auth = CredentialStore::new(kv, config);
        auth.bootstrap()?;
        Ok(Self { auth })
    }

    pub fn auth(&self) -> &CredentialStore { &self.auth }

    pub fn issues(&self) -> IssueBoard<'_> {
        IssueBoard::new(self.auth.kv(), self.auth.keys().issues(), self.auth.ids())
    }

    pub fn updates(&self) -> UpdateFeed<'_> {
        UpdateFeed::new(self.auth.kv(), self.auth.keys().updates(), self.auth.ids())
    }

    pub fn crowdfunds(&self) -> CrowdfundBoard<'_> {
        CrowdfundBoard::new(self.auth.kv(), self.auth.keys().crowdfunds(), self.auth.ids())
    }

    /// Dashboard counters; the "my" counters are relative to `viewer`.
    pub fn stats(&self, viewer: Option<&Account>) -> AppResult<DashboardStats> {
        let users = self.auth.list_accounts()?;
        let issues = self.issues().list(None)?;
        let updates = self.updates().list()?;
        Ok(dashboard::compute(viewer, &users, &issues, &updates))
    }

    /// Admin-only. Removes the issues the account reported, the updates it posted,
    /// then the account and its credential record.
    pub fn delete_account(&self, actor: &Account, account_id: &str) -> AppResult<DeletionReport> {
        authorizer::require(actor, Action::ManageUsers)?;
        if actor.id == account_id {
            return Err(ValidationError::CannotDeleteSelf.into());
        }
        if self.auth.find_account(account_id)?.is_none() {
            return Err(AppError::not_found("account_not_found".to_string(), format!("no account '{}'", account_id)));
        }
        // Dependents go first so a failed call leaves the account in place to retry.
        let issues_removed = self.issues().remove_by_citizen(account_id)?;
        let updates_removed = self.updates().remove_by_politician(account_id)?;
        let account = self.auth.remove_account(account_id)?;
        info!(
            target: "civic::portal",
            "account deleted id={} by={} issues_removed={} updates_removed={}",
            account.id, actor.id, issues_removed, updates_removed
        );
        Ok(DeletionReport { account, issues_removed, updates_removed })
    }
}
