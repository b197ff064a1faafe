use tracing::info;

use super::model::{Issue, IssueResponse, IssueStatus, NewIssue};
use crate::error::{AppError, AppResult, ValidationError};
use crate::identity::authorizer::{self, Action};
use crate::identity::{now_rfc3339, Account, IdAllocator};
use crate::storage::{read_json_or_default, write_json, KvBackend};

/// Citizen-reported issues with their response threads.
pub struct IssueBoard<'a> {
    kv: &'a dyn KvBackend,
    key: String,
    ids: &'a dyn IdAllocator,
}

impl<'a> IssueBoard<'a> {
    pub fn new(kv: &'a dyn KvBackend, key: String, ids: &'a dyn IdAllocator) -> Self { Self { kv, key, ids } }

    fn load(&self) -> AppResult<Vec<Issue>> { read_json_or_default(self.kv, &self.key) }
    fn save(&self, issues: &[Issue]) -> AppResult<()> { write_json(self.kv, &self.key, issues) }

    fn not_found(id: &str) -> AppError {
        AppError::not_found("issue_not_found".to_string(), format!("no issue '{}'", id))
    }

    /// Issues in stored order, optionally narrowed to one status.
    pub fn list(&self, status: Option<IssueStatus>) -> AppResult<Vec<Issue>> {
        let issues = self.load()?;
        Ok(match status {
            Some(s) => issues.into_iter().filter(|i| i.status == s).collect(),
            None => issues,
        })
    }

    pub fn get(&self, id: &str) -> AppResult<Option<Issue>> {
        Ok(self.load()?.into_iter().find(|i| i.id == id))
    }

    pub fn report(&self, actor: &Account, new: NewIssue) -> AppResult<Issue> {
        authorizer::require(actor, Action::ReportIssue)?;
        if new.title.trim().is_empty() { return Err(ValidationError::MissingField("title").into()); }
        if new.description.trim().is_empty() { return Err(ValidationError::MissingField("description").into()); }
        let mut issues = self.load()?;
        let issue = Issue {
            id: self.ids.next_id(self.kv)?,
            title: new.title,
            description: new.description,
            location: new.location,
            photo: new.photo.filter(|p| !p.trim().is_empty()),
            status: IssueStatus::Open,
            citizen_id: actor.id.clone(),
            citizen_name: actor.name.clone(),
            created_at: now_rfc3339(),
            responses: Vec::new(),
        };
        issues.push(issue.clone());
        self.save(&issues)?;
        info!(target: "civic::portal", "issue reported id={} by={}", issue.id, actor.id);
        Ok(issue)
    }

    pub fn respond(&self, actor: &Account, issue_id: &str, message: &str) -> AppResult<IssueResponse> {
        authorizer::require(actor, Action::RespondToIssue)?;
        if message.trim().is_empty() { return Err(ValidationError::MissingField("message").into()); }
        let mut issues = self.load()?;
        let Some(issue) = issues.iter_mut().find(|i| i.id == issue_id) else { return Err(Self::not_found(issue_id)); };
        let response = IssueResponse {
            id: self.ids.next_id(self.kv)?,
            issue_id: issue_id.to_string(),
            user_id: actor.id.clone(),
            user_name: actor.name.clone(),
            user_role: actor.role,
            message: message.to_string(),
            created_at: now_rfc3339(),
        };
        issue.responses.push(response.clone());
        self.save(&issues)?;
        info!(target: "civic::portal", "issue response id={} issue={} by={}", response.id, issue_id, actor.id);
        Ok(response)
    }

    pub fn set_status(&self, actor: &Account, issue_id: &str, status: IssueStatus) -> AppResult<Issue> {
        authorizer::require(actor, Action::ChangeIssueStatus)?;
        let mut issues = self.load()?;
        let Some(issue) = issues.iter_mut().find(|i| i.id == issue_id) else { return Err(Self::not_found(issue_id)); };
        issue.status = status;
        let updated = issue.clone();
        self.save(&issues)?;
        info!(target: "civic::portal", "issue status id={} status={} by={}", issue_id, status, actor.id);
        Ok(updated)
    }

    pub fn delete(&self, actor: &Account, issue_id: &str) -> AppResult<Issue> {
        authorizer::require(actor, Action::DeleteIssue)?;
        let mut issues = self.load()?;
        let Some(pos) = issues.iter().position(|i| i.id == issue_id) else { return Err(Self::not_found(issue_id)); };
        let removed = issues.remove(pos);
        self.save(&issues)?;
        info!(target: "civic::portal", "issue deleted id={} by={}", issue_id, actor.id);
        Ok(removed)
    }

    /// Drop every issue reported by `citizen_id`. Returns how many went.
    pub(crate) fn remove_by_citizen(&self, citizen_id: &str) -> AppResult<usize> {
        let issues = self.load()?;
        let before = issues.len();
        let kept: Vec<Issue> = issues.into_iter().filter(|i| i.citizen_id != citizen_id).collect();
        let removed = before - kept.len();
        if removed > 0 { self.save(&kept)?; }
        Ok(removed)
    }
}
