use chrono::{DateTime, FixedOffset};
use tracing::info;

use super::model::Update;
use crate::error::{AppError, AppResult, ValidationError};
use crate::identity::authorizer::{self, Action};
use crate::identity::{now_rfc3339, Account, IdAllocator};
use crate::storage::{read_json_or_default, write_json, KvBackend};

/// Politicians' announcement feed, newest first.
pub struct UpdateFeed<'a> {
    kv: &'a dyn KvBackend,
    key: String,
    ids: &'a dyn IdAllocator,
}

fn parsed_time(u: &Update) -> Option<DateTime<FixedOffset>> { DateTime::parse_from_rfc3339(&u.created_at).ok() }

impl<'a> UpdateFeed<'a> {
    pub fn new(kv: &'a dyn KvBackend, key: String, ids: &'a dyn IdAllocator) -> Self { Self { kv, key, ids } }

    fn load(&self) -> AppResult<Vec<Update>> { read_json_or_default(self.kv, &self.key) }
    fn save(&self, updates: &[Update]) -> AppResult<()> { write_json(self.kv, &self.key, updates) }

    /// Sorted by `createdAt` descending; unparsable timestamps sink to the end.
    pub fn list(&self) -> AppResult<Vec<Update>> {
        let mut updates = self.load()?;
        updates.sort_by(|a, b| parsed_time(b).cmp(&parsed_time(a)));
        Ok(updates)
    }

    pub fn post(&self, actor: &Account, title: &str, content: &str) -> AppResult<Update> {
        authorizer::require(actor, Action::PostUpdate)?;
        if title.trim().is_empty() { return Err(ValidationError::MissingField("title").into()); }
        if content.trim().is_empty() { return Err(ValidationError::MissingField("content").into()); }
        let mut updates = self.load()?;
        let update = Update {
            id: self.ids.next_id(self.kv)?,
            title: title.to_string(),
            content: content.to_string(),
            politician_id: actor.id.clone(),
            politician_name: actor.name.clone(),
            created_at: now_rfc3339(),
        };
        updates.insert(0, update.clone());
        self.save(&updates)?;
        info!(target: "civic::portal", "update posted id={} by={}", update.id, actor.id);
        Ok(update)
    }

    /// Authors may delete their own updates; moderators and admins any.
    pub fn delete(&self, actor: &Account, update_id: &str) -> AppResult<Update> {
        let mut updates = self.load()?;
        let Some(pos) = updates.iter().position(|u| u.id == update_id) else {
            return Err(AppError::not_found("update_not_found".to_string(), format!("no update '{}'", update_id)));
        };
        let own = updates[pos].politician_id == actor.id;
        authorizer::require(actor, Action::DeleteUpdate { own })?;
        let removed = updates.remove(pos);
        self.save(&updates)?;
        info!(target: "civic::portal", "update deleted id={} by={}", update_id, actor.id);
        Ok(removed)
    }

    pub(crate) fn remove_by_politician(&self, politician_id: &str) -> AppResult<usize> {
        let updates = self.load()?;
        let before = updates.len();
        let kept: Vec<Update> = updates.into_iter().filter(|u| u.politician_id != politician_id).collect();
        let removed = before - kept.len();
        if removed > 0 { self.save(&kept)?; }
        Ok(removed)
    }
}
