//! Post likes, one per client IP.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::{PostService, Result, ServiceError};
use crate::bus::{publish_detached, topics, EventBus};
use crate::domain::PostLike;
use crate::events::LikePostEvent;
use crate::storage::{PostLikeStore, StorageError};
use crate::utils::inflight::InFlightSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked,
    AlreadyLiked,
    /// The same client is already liking this post.
    InProgress,
}

pub struct PostLikeService {
    likes: Arc<dyn PostLikeStore>,
    posts: Arc<PostService>,
    bus: Arc<dyn EventBus>,
    in_flight: InFlightSet,
}

impl PostLikeService {
    pub fn new(
        likes: Arc<dyn PostLikeStore>,
        posts: Arc<PostService>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            likes,
            posts,
            bus,
            in_flight: InFlightSet::new(),
        }
    }

    pub async fn like(&self, post_id: &str, ip: &str, user_agent: &str) -> Result<LikeOutcome> {
        if ip.is_empty() {
            return Err(ServiceError::InvalidIp);
        }
        let Some(_guard) = self.in_flight.try_acquire(format!("{post_id}:{ip}")) else {
            debug!(post_id, ip, "Like already in progress");
            return Ok(LikeOutcome::InProgress);
        };

        if self.likes.find(post_id, ip).await?.is_some() {
            return Ok(LikeOutcome::AlreadyLiked);
        }

        let like = PostLike::new(post_id, ip, user_agent);
        match self.likes.insert(&like).await {
            Ok(()) => {}
            Err(StorageError::Duplicate { .. }) => return Ok(LikeOutcome::AlreadyLiked),
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.posts.increase_like_count(post_id).await {
            error!(post_id, ip, error = %e, "Like count update failed, removing like");
            if let Err(undo) = self.likes.delete(&like.id).await {
                error!(post_id, like_id = %like.id, error = %undo, "Like removal failed");
            }
            return Err(e);
        }
        info!(post_id, "Post liked");

        let event = LikePostEvent {
            post_id: post_id.to_string(),
        };
        publish_detached(&self.bus, topics::POST_LIKE, &event);
        Ok(LikeOutcome::Liked)
    }

    pub async fn is_liked(&self, post_id: &str, ip: &str) -> Result<bool> {
        Ok(self.likes.find(post_id, ip).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MockEventBus;
    use crate::storage::{MemoryPostLikeStore, MemoryPostStore, PostStore};
    use crate::test_utils::post;

    struct Harness {
        posts: Arc<MemoryPostStore>,
        likes: Arc<MemoryPostLikeStore>,
        bus: Arc<MockEventBus>,
        service: PostLikeService,
    }

    async fn harness() -> Harness {
        let posts = Arc::new(MemoryPostStore::new());
        posts.insert(&post("p1", &[], &[], None)).await.unwrap();
        let likes = Arc::new(MemoryPostLikeStore::new());
        let bus = Arc::new(MockEventBus::new());
        let post_service = Arc::new(PostService::new(posts.clone(), bus.clone()));
        let service = PostLikeService::new(likes.clone(), post_service, bus.clone());
        Harness {
            posts,
            likes,
            bus,
            service,
        }
    }

    #[tokio::test]
    async fn test_like_records_and_publishes() {
        let h = harness().await;

        let outcome = h.service.like("p1", "10.0.0.1", "curl").await.unwrap();

        assert_eq!(outcome, LikeOutcome::Liked);
        assert!(h.service.is_liked("p1", "10.0.0.1").await.unwrap());
        assert_eq!(h.posts.find_by_id("p1").await.unwrap().unwrap().like_count, 1);
        h.bus.wait_for_published(topics::POST_LIKE, 1).await;
        let events: Vec<LikePostEvent> = h.bus.decode_published(topics::POST_LIKE).await;
        assert_eq!(events[0].post_id, "p1");
    }

    #[tokio::test]
    async fn test_second_like_is_noop() {
        let h = harness().await;
        h.service.like("p1", "10.0.0.1", "curl").await.unwrap();

        let outcome = h.service.like("p1", "10.0.0.1", "curl").await.unwrap();

        assert_eq!(outcome, LikeOutcome::AlreadyLiked);
        assert_eq!(h.posts.find_by_id("p1").await.unwrap().unwrap().like_count, 1);
        assert_eq!(h.likes.len().await, 1);
    }

    #[tokio::test]
    async fn test_like_in_flight_is_noop() {
        let h = harness().await;
        let _held = h.service.in_flight.try_acquire("p1:10.0.0.1").unwrap();

        let outcome = h.service.like("p1", "10.0.0.1", "curl").await.unwrap();

        assert_eq!(outcome, LikeOutcome::InProgress);
        assert!(h.likes.is_empty().await);
    }

    #[tokio::test]
    async fn test_like_requires_ip() {
        let h = harness().await;
        assert!(matches!(
            h.service.like("p1", "", "curl").await.unwrap_err(),
            ServiceError::InvalidIp
        ));
    }

    #[tokio::test]
    async fn test_like_removed_when_count_update_fails() {
        let h = harness().await;
        h.posts.set_fail_on_counter(true).await;

        let err = h.service.like("p1", "10.0.0.1", "curl").await.unwrap_err();

        assert!(matches!(err, ServiceError::Storage(_)));
        assert!(h.likes.is_empty().await);
        assert!(!h.service.in_flight.contains("p1:10.0.0.1"));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(h.bus.published_count().await, 0);
    }

    #[tokio::test]
    async fn test_like_missing_post() {
        let h = harness().await;

        let err = h.service.like("ghost", "10.0.0.1", "curl").await.unwrap_err();

        assert!(matches!(err, ServiceError::PostNotFound(_)));
        assert!(h.likes.is_empty().await);
    }
}
