use serde::Serialize;

use super::model::{Issue, IssueStatus, Update};
use crate::identity::Account;

/// Counters shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_issues: usize,
    pub open_issues: usize,
    pub resolved_issues: usize,
    pub total_updates: usize,
    pub total_users: usize,
    pub my_issues: usize,
    pub my_updates: usize,
}

pub fn compute(viewer: Option<&Account>, users: &[Account], issues: &[Issue], updates: &[Update]) -> DashboardStats {
    let me = viewer.map(|a| a.id.as_str());
    DashboardStats {
        total_issues: issues.len(),
        open_issues: issues.iter().filter(|i| i.status == IssueStatus::Open).count(),
        resolved_issues: issues.iter().filter(|i| i.status == IssueStatus::Resolved).count(),
        total_updates: updates.len(),
        total_users: users.len(),
        my_issues: issues.iter().filter(|i| Some(i.citizen_id.as_str()) == me).count(),
        my_updates: updates.iter().filter(|u| Some(u.politician_id.as_str()) == me).count(),
    }
}
