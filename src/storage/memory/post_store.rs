use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::injected;
use crate::domain::Post;
use crate::storage::{PostCounter, PostFlag, PostStore, Result, StorageError};

const ENTITY: &str = "post";

#[derive(Default)]
pub struct MemoryPostStore {
    posts: RwLock<HashMap<String, Post>>,
    fail_on_write: RwLock<bool>,
    fail_on_counter: RwLock<bool>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail insert, update and delete.
    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    /// Fail counter adjustments only.
    pub async fn set_fail_on_counter(&self, fail: bool) {
        *self.fail_on_counter.write().await = fail;
    }

    async fn check_write(&self, operation: &str) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(injected(operation));
        }
        Ok(())
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn insert(&self, post: &Post) -> Result<()> {
        self.check_write("insert post").await?;
        let mut posts = self.posts.write().await;
        if posts.contains_key(&post.id) {
            return Err(StorageError::Duplicate {
                entity: ENTITY,
                key: post.id.clone(),
            });
        }
        posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn update(&self, post: &Post) -> Result<()> {
        self.check_write("update post").await?;
        let mut posts = self.posts.write().await;
        let stored = posts
            .get_mut(&post.id)
            .ok_or_else(|| StorageError::not_found(ENTITY, &post.id))?;
        *stored = Post {
            updated_at: Utc::now(),
            ..post.clone()
        };
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Post>> {
        Ok(self.posts.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.check_write("delete post").await?;
        Ok(self.posts.write().await.remove(id).is_some())
    }

    async fn add_to_counter(&self, id: &str, counter: PostCounter, delta: i64) -> Result<()> {
        if *self.fail_on_counter.read().await {
            return Err(injected("post counter"));
        }
        let mut posts = self.posts.write().await;
        let post = posts
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(ENTITY, id))?;
        let field = match counter {
            PostCounter::Comment => &mut post.comment_count,
            PostCounter::Visit => &mut post.visit_count,
            PostCounter::Like => &mut post.like_count,
        };
        *field += delta;
        Ok(())
    }

    async fn set_flag(&self, id: &str, flag: PostFlag, value: bool) -> Result<()> {
        self.check_write("set post flag").await?;
        let mut posts = self.posts.write().await;
        let post = posts
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(ENTITY, id))?;
        match flag {
            PostFlag::Displayed => post.is_displayed = value,
            PostFlag::CommentAllowed => post.is_comment_allowed = value,
        }
        post.updated_at = Utc::now();
        Ok(())
    }
}
