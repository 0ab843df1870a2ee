use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::PostLike;
use crate::storage::{PostLikeStore, Result, StorageError};

/// Likes keyed by `(post_id, ip)`.
#[derive(Default)]
pub struct MemoryPostLikeStore {
    likes: RwLock<HashMap<(String, String), PostLike>>,
}

impl MemoryPostLikeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.likes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PostLikeStore for MemoryPostLikeStore {
    async fn insert(&self, like: &PostLike) -> Result<()> {
        let key = (like.post_id.clone(), like.ip.clone());
        let mut likes = self.likes.write().await;
        if likes.contains_key(&key) {
            return Err(StorageError::Duplicate {
                entity: "post like",
                key: format!("{}:{}", like.post_id, like.ip),
            });
        }
        likes.insert(key, like.clone());
        Ok(())
    }

    async fn find(&self, post_id: &str, ip: &str) -> Result<Option<PostLike>> {
        Ok(self
            .likes
            .read()
            .await
            .get(&(post_id.to_string(), ip.to_string()))
            .cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut likes = self.likes.write().await;
        let before = likes.len();
        likes.retain(|_, like| like.id != id);
        Ok(likes.len() < before)
    }
}
