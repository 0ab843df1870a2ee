//! Post lifecycle: persists posts, publishes membership deltas on the
//! `post` topic, and keeps the post's own comment counter from `comment`
//! events.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use super::{Result, ServiceError};
use crate::bus::{publish_detached, topics, EventBus, EventListener};
use crate::domain::Post;
use crate::events::{CommentEvent, CommentEventType, PostEvent};
use crate::storage::{PostCounter, PostFlag, PostStore, StorageError};

pub struct PostService {
    store: Arc<dyn PostStore>,
    bus: Arc<dyn EventBus>,
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>, bus: Arc<dyn EventBus>) -> Self {
        Self { store, bus }
    }

    /// Persist a new post. An id is generated when absent.
    pub async fn add_post(&self, mut post: Post) -> Result<Post> {
        if post.id.is_empty() {
            post.id = uuid::Uuid::new_v4().simple().to_string();
        }
        let now = Utc::now();
        post.created_at = now;
        post.updated_at = now;

        self.store.insert(&post).await?;
        info!(post_id = %post.id, "Post created");

        publish_detached(&self.bus, topics::POST, &PostEvent::created(&post));
        Ok(post)
    }

    /// Persist `updated` and publish what changed relative to `original`.
    ///
    /// With `is_new` this behaves like `add_post` and `original` is ignored.
    pub async fn save_post(&self, original: &Post, updated: Post, is_new: bool) -> Result<Post> {
        if is_new {
            return self.add_post(updated).await;
        }
        if updated.id != original.id {
            return Err(ServiceError::InvalidPost(format!(
                "cannot save post {} over {}",
                updated.id, original.id
            )));
        }

        self.store
            .update(&updated)
            .await
            .map_err(|e| not_found_as_post(e, &updated.id))?;
        info!(post_id = %updated.id, "Post updated");

        let event = PostEvent::updated(original, &updated);
        debug!(
            post_id = %updated.id,
            added_categories = event.added_category_id.len(),
            removed_categories = event.deleted_category_id.len(),
            added_tags = event.added_tag_id.len(),
            removed_tags = event.deleted_tag_id.len(),
            "Post membership delta"
        );
        publish_detached(&self.bus, topics::POST, &event);
        Ok(updated)
    }

    /// Delete a post. The event carries the state loaded before deletion.
    pub async fn delete_post(&self, id: &str) -> Result<()> {
        let post = self.find_by_id(id).await?;
        if !self.store.delete(id).await? {
            return Err(ServiceError::PostNotFound(id.to_string()));
        }
        info!(post_id = %id, comment_count = post.comment_count, "Post deleted");

        publish_detached(&self.bus, topics::POST, &PostEvent::deleted(&post));
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Post> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::PostNotFound(id.to_string()))
    }

    pub async fn increase_visit_count(&self, id: &str) -> Result<()> {
        self.store
            .add_to_counter(id, PostCounter::Visit, 1)
            .await
            .map_err(|e| not_found_as_post(e, id))
    }

    pub async fn increase_like_count(&self, id: &str) -> Result<()> {
        self.store
            .add_to_counter(id, PostCounter::Like, 1)
            .await
            .map_err(|e| not_found_as_post(e, id))
    }

    pub async fn set_displayed(&self, id: &str, displayed: bool) -> Result<()> {
        self.store
            .set_flag(id, PostFlag::Displayed, displayed)
            .await
            .map_err(|e| not_found_as_post(e, id))
    }

    pub async fn set_comment_allowed(&self, id: &str, allowed: bool) -> Result<()> {
        self.store
            .set_flag(id, PostFlag::CommentAllowed, allowed)
            .await
            .map_err(|e| not_found_as_post(e, id))
    }
}

fn not_found_as_post(error: StorageError, id: &str) -> ServiceError {
    match error {
        StorageError::NotFound { .. } => ServiceError::PostNotFound(id.to_string()),
        other => other.into(),
    }
}

/// Applies comment events to the post's own comment counter.
pub struct PostCommentListener {
    store: Arc<dyn PostStore>,
}

impl PostCommentListener {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventListener for PostCommentListener {
    type Event = CommentEvent;
    type Error = StorageError;

    fn name(&self) -> &'static str {
        "post-comment-count"
    }

    async fn on_event(&self, event: CommentEvent) -> std::result::Result<(), StorageError> {
        let delta = match event.event_type {
            CommentEventType::Create => 1,
            CommentEventType::Delete => -event.count,
        };
        self.store
            .add_to_counter(&event.post_id, PostCounter::Comment, delta)
            .await?;
        debug!(post_id = %event.post_id, delta, "Post comment count adjusted");
        Ok(())
    }
}
