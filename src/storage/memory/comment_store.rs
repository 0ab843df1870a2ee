use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::injected;
use crate::domain::{ApprovalStatus, Comment, CommentPage, CommentQuery, Reply};
use crate::storage::{CommentStore, Result, StorageError};

const ENTITY: &str = "comment";

/// Comments held in a map keyed by id.
#[derive(Default)]
pub struct MemoryCommentStore {
    comments: RwLock<HashMap<String, Comment>>,
    fail_on_write: RwLock<bool>,
}

impl MemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every mutating call fail.
    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    pub async fn len(&self) -> usize {
        self.comments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn check_write(&self, operation: &str) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(injected(operation));
        }
        Ok(())
    }
}

fn newest_first(a: &Comment, b: &Comment) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Most recent creation time among the comment and its replies.
fn last_activity(comment: &Comment) -> DateTime<Utc> {
    comment
        .replies
        .iter()
        .map(|r| r.created_at)
        .fold(comment.created_at, |latest, t| latest.max(t))
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn insert(&self, mut comment: Comment) -> Result<String> {
        self.check_write("insert comment").await?;
        let id = uuid::Uuid::new_v4().simple().to_string();
        comment.id = id.clone();
        self.comments.write().await.insert(id.clone(), comment);
        Ok(id)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Comment>> {
        Ok(self.comments.read().await.get(id).cloned())
    }

    async fn push_reply(&self, comment_id: &str, reply: Reply) -> Result<()> {
        self.check_write("push reply").await?;
        let mut comments = self.comments.write().await;
        let comment = comments
            .get_mut(comment_id)
            .ok_or_else(|| StorageError::not_found(ENTITY, comment_id))?;
        comment.updated_at = reply.created_at;
        comment.replies.push(reply);
        Ok(())
    }

    async fn approve_comments(&self, ids: &[String]) -> Result<Vec<Comment>> {
        self.check_write("approve comments").await?;
        let now = Utc::now();
        let mut comments = self.comments.write().await;
        let mut approved = Vec::new();
        for id in ids {
            if let Some(comment) = comments.get_mut(id) {
                if comment.approval_status == ApprovalStatus::Pending {
                    comment.approval_status = ApprovalStatus::Approved;
                    comment.updated_at = now;
                    approved.push(comment.clone());
                }
            }
        }
        Ok(approved)
    }

    async fn approve_replies(&self, comment_id: &str, reply_ids: &[String]) -> Result<Vec<Reply>> {
        self.check_write("approve replies").await?;
        let now = Utc::now();
        let mut comments = self.comments.write().await;
        let comment = comments
            .get_mut(comment_id)
            .ok_or_else(|| StorageError::not_found(ENTITY, comment_id))?;

        let mut approved = Vec::new();
        for reply in comment.replies.iter_mut() {
            if reply.approval_status == ApprovalStatus::Pending
                && reply_ids.contains(&reply.reply_id)
            {
                reply.approval_status = ApprovalStatus::Approved;
                reply.updated_at = now;
                approved.push(reply.clone());
            }
        }
        Ok(approved)
    }

    async fn delete_many(&self, ids: &[String]) -> Result<Vec<Comment>> {
        self.check_write("delete comments").await?;
        let mut comments = self.comments.write().await;
        Ok(ids.iter().filter_map(|id| comments.remove(id)).collect())
    }

    async fn delete_replies(&self, comment_id: &str, reply_ids: &[String]) -> Result<Vec<String>> {
        self.check_write("delete replies").await?;
        let mut comments = self.comments.write().await;
        let comment = comments
            .get_mut(comment_id)
            .ok_or_else(|| StorageError::not_found(ENTITY, comment_id))?;

        let mut removed = Vec::new();
        comment.replies.retain(|r| {
            if reply_ids.contains(&r.reply_id) {
                removed.push(r.reply_id.clone());
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    async fn delete_by_post_id(&self, post_id: &str) -> Result<u64> {
        self.check_write("delete comments by post").await?;
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|_, c| c.post_info.post_id != post_id);
        Ok((before - comments.len()) as u64)
    }

    async fn find_by_post_id(&self, post_id: &str) -> Result<Vec<Comment>> {
        let comments = self.comments.read().await;
        let mut found: Vec<Comment> = comments
            .values()
            .filter(|c| c.post_info.post_id == post_id)
            .cloned()
            .collect();
        found.sort_by(newest_first);
        Ok(found)
    }

    async fn find_page(&self, query: &CommentQuery) -> Result<CommentPage> {
        let keyword = query
            .keyword
            .as_deref()
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase);

        let comments = self.comments.read().await;
        let mut matched: Vec<Comment> = comments
            .values()
            .filter(|c| match &keyword {
                Some(k) => c.content.to_lowercase().contains(k),
                None => true,
            })
            .filter_map(|c| query.filter.project(c))
            .collect();
        matched.sort_by(newest_first);

        let total = matched.len();
        let size = if query.size == 0 { usize::MAX } else { query.size };
        let comments = matched.into_iter().skip(query.skip).take(size).collect();
        Ok(CommentPage { comments, total })
    }

    async fn find_latest_approved(&self, limit: usize) -> Result<Vec<Comment>> {
        let comments = self.comments.read().await;
        let mut approved: Vec<Comment> = comments
            .values()
            .filter(|c| c.approval_status.is_approved())
            .map(|c| c.with_replies(|r| r.approval_status.is_approved()))
            .collect();
        approved.sort_by(|a, b| last_activity(b).cmp(&last_activity(a)));
        approved.truncate(limit);
        Ok(approved)
    }

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64> {
        let comments = self.comments.read().await;
        Ok(comments.values().filter(|c| c.created_at >= since).count() as u64)
    }
}
