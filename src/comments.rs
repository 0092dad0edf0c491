use std::sync::Arc;

use dashmap::DashMap;
use ulid::Ulid;

use crate::clock::Clock;
use crate::directory::{ItemCatalog, UserDirectory};
use crate::engine::{Engine, EngineError};
use crate::model::*;

/// Comment creation collaborator. A user may comment on an item only if they
/// have a completed booking of it; the booking engine answers that question.
pub struct CommentService {
    engine: Arc<Engine>,
    users: Arc<dyn UserDirectory>,
    items: Arc<dyn ItemCatalog>,
    clock: Arc<dyn Clock>,
    comments: DashMap<Ulid, Comment>,
}

impl CommentService {
    pub fn new(
        engine: Arc<Engine>,
        users: Arc<dyn UserDirectory>,
        items: Arc<dyn ItemCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            users,
            items,
            clock,
            comments: DashMap::new(),
        }
    }

    pub async fn add_comment(
        &self,
        text: String,
        item_id: Ulid,
        author_id: Ulid,
    ) -> Result<Comment, EngineError> {
        let author = self
            .users
            .get(author_id)
            .ok_or(EngineError::UserNotFound(author_id))?;
        self.items
            .get(item_id)
            .ok_or(EngineError::ItemNotFound(item_id))?;

        if !self.engine.has_finished_booking(author_id, item_id).await {
            return Err(EngineError::Validation(
                "only a user with a completed booking may comment on an item".into(),
            ));
        }

        let comment = Comment {
            id: Ulid::new(),
            item_id,
            author_id,
            author_name: author.name,
            text,
            created: self.clock.now_ms(),
        };
        self.comments.insert(comment.id, comment.clone());
        tracing::info!(comment = %comment.id, item = %item_id, author = %author_id, "comment added");
        Ok(comment)
    }

    /// Comments of one item, oldest first.
    pub fn comments_for_item(&self, item_id: Ulid) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .filter(|e| e.item_id == item_id)
            .map(|e| e.value().clone())
            .collect();
        comments.sort_by_key(|c| (c.created, c.id));
        comments
    }
}
