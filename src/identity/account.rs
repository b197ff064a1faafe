use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Citizen,
    Politician,
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Citizen => "citizen",
            Role::Politician => "politician",
            Role::Moderator => "moderator",
        }
    }

    /// Roles a new account may pick for itself.
    pub fn self_assignable(&self) -> bool { matches!(self, Role::Citizen | Role::Politician) }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "citizen" => Ok(Role::Citizen),
            "politician" => Ok(Role::Politician),
            "moderator" => Ok(Role::Moderator),
            other => Err(AppError::user("unknown_role".to_string(), format!("unknown role '{}'", other))),
        }
    }
}

/// A registered identity. Field names follow the persisted snapshot shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    /// Login key; compared exactly, case-sensitive.
    pub email: String,
    pub role: Role,
    /// RFC 3339 UTC
    pub created_at: String,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), name: name.into(), email: email.into(), role, created_at: now_rfc3339() }
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
