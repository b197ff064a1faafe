use tracing::info;

use super::model::CrowdfundPost;
use crate::error::{AppError, AppResult, ValidationError};
use crate::identity::authorizer::{self, Action};
use crate::identity::{now_rfc3339, Account, IdAllocator};
use crate::storage::{read_json_or_default, write_json, KvBackend};

pub struct CrowdfundBoard<'a> {
    kv: &'a dyn KvBackend,
    key: String,
    ids: &'a dyn IdAllocator,
}

impl<'a> CrowdfundBoard<'a> {
    pub fn new(kv: &'a dyn KvBackend, key: String, ids: &'a dyn IdAllocator) -> Self { Self { kv, key, ids } }

    fn load(&self) -> AppResult<Vec<CrowdfundPost>> { read_json_or_default(self.kv, &self.key) }
    fn save(&self, posts: &[CrowdfundPost]) -> AppResult<()> { write_json(self.kv, &self.key, posts) }

    /// Stored order (newest first).
    pub fn list(&self) -> AppResult<Vec<CrowdfundPost>> { self.load() }

    pub fn create(&self, actor: &Account, title: &str, description: &str, photo: Option<&str>) -> AppResult<CrowdfundPost> {
        authorizer::require(actor, Action::CreateCrowdfund)?;
        let title = title.trim();
        let description = description.trim();
        if title.is_empty() { return Err(ValidationError::MissingField("title").into()); }
        if description.is_empty() { return Err(ValidationError::MissingField("description").into()); }
        let mut posts = self.load()?;
        let post = CrowdfundPost {
            id: self.ids.next_id(self.kv)?,
            title: title.to_string(),
            description: description.to_string(),
            photo: photo.map(str::trim).filter(|p| !p.is_empty()).map(str::to_string),
            author_id: Some(actor.id.clone()),
            author_name: Some(actor.name.clone()),
            created_at: now_rfc3339(),
        };
        posts.insert(0, post.clone());
        self.save(&posts)?;
        info!(target: "civic::portal", "crowdfund created id={} by={}", post.id, actor.id);
        Ok(post)
    }

    pub fn delete(&self, actor: &Account, post_id: &str) -> AppResult<CrowdfundPost> {
        authorizer::require(actor, Action::DeleteCrowdfund)?;
        let mut posts = self.load()?;
        let Some(pos) = posts.iter().position(|p| p.id == post_id) else {
            return Err(AppError::not_found("crowdfund_not_found".to_string(), format!("no crowdfund post '{}'", post_id)));
        };
        let removed = posts.remove(pos);
        self.save(&posts)?;
        info!(target: "civic::portal", "crowdfund deleted id={} by={}", post_id, actor.id);
        Ok(removed)
    }
}
