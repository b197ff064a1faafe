use tracing::debug;

use super::account::{Account, Role};
use crate::error::{AppError, AppResult};

/// Things an account can try to do to portal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReportIssue,
    RespondToIssue,
    ChangeIssueStatus,
    DeleteIssue,
    PostUpdate,
    /// `own` is true when the actor authored the update
    DeleteUpdate { own: bool },
    ManageUsers,
    CreateCrowdfund,
    DeleteCrowdfund,
}

pub fn is_allowed(role: Role, action: Action) -> bool {
    // Admin override
    if role == Role::Admin { return true; }
    match action {
        Action::ReportIssue => role == Role::Citizen,
        Action::RespondToIssue => matches!(role, Role::Politician | Role::Moderator),
        Action::ChangeIssueStatus => role == Role::Politician,
        Action::DeleteIssue => role == Role::Moderator,
        Action::PostUpdate => role == Role::Politician,
        Action::DeleteUpdate { own } => role == Role::Moderator || (own && role == Role::Politician),
        // User administration is restricted to admins (handled above)
        Action::ManageUsers => false,
        Action::CreateCrowdfund | Action::DeleteCrowdfund => true,
    }
}

/// Gate an operation, turning a denial into `AppError::Forbidden`.
pub fn require(actor: &Account, action: Action) -> AppResult<()> {
    if is_allowed(actor.role, action) { return Ok(()); }
    debug!(target: "civic::auth", "denied user={} role={} action={:?}", actor.id, actor.role, action);
    Err(AppError::forbidden("forbidden".to_string(), format!("role '{}' may not {:?}", actor.role, action)))
}
