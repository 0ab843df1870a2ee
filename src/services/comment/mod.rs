//! Comment moderation engine.
//!
//! Owns the comment aggregate and its replies, the pending → approved
//! state machine, and the `comment` topic. Counters that depend on
//! comments are kept by other modules from the events published here.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{join, join_all};
use tracing::{debug, info, warn};

use super::{validate_website, Result, ServiceError};
use crate::bus::{publish_detached, topics, EventBus, EventListener};
use crate::domain::{
    ApprovalStatus, Comment, CommentPage, CommentQuery, EmailInfo, LatestComment,
    ModerationFilter, Reply, ReplyGroup,
};
use crate::events::{CommentEvent, PostEvent, PostEventType};
use crate::notify::{templates, users_detached, webmaster_detached, Notifier};
use crate::storage::{CommentStore, StorageError};

/// Outcome of `batch_approve`.
#[derive(Debug, Default)]
pub struct BatchApproval {
    /// Authors whose comment or reply was approved.
    pub approval_emails: Vec<EmailInfo>,
    /// Users who were answered by an approved reply.
    pub replied_emails: Vec<EmailInfo>,
    pub failures: Vec<BatchFailure>,
}

/// Outcome of `batch_delete`.
#[derive(Debug, Default)]
pub struct BatchDeletion {
    pub comments_deleted: usize,
    pub replies_deleted: usize,
    pub failures: Vec<BatchFailure>,
}

/// A batch group that failed as a whole.
#[derive(Debug)]
pub struct BatchFailure {
    /// Parent comment of a reply group; `None` for the top-level comments.
    pub comment_id: Option<String>,
    pub error: ServiceError,
}

#[derive(Default)]
struct GroupNotices {
    approval: Vec<EmailInfo>,
    replied: Vec<EmailInfo>,
}

fn email_info(email: &str, post_url: &str) -> Option<EmailInfo> {
    (!email.is_empty()).then(|| EmailInfo {
        email: email.to_string(),
        post_url: post_url.to_string(),
    })
}

pub struct CommentService {
    store: Arc<dyn CommentStore>,
    bus: Arc<dyn EventBus>,
    notifier: Arc<dyn Notifier>,
}

impl CommentService {
    pub fn new(
        store: Arc<dyn CommentStore>,
        bus: Arc<dyn EventBus>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            bus,
            notifier,
        }
    }

    /// Store a new pending comment and return its id.
    pub async fn add_comment(&self, mut comment: Comment) -> Result<String> {
        if comment.post_info.post_id.is_empty() {
            return Err(ServiceError::InvalidPost("post id is required".to_string()));
        }
        validate_website(&comment.user_info.website)?;

        let now = Utc::now();
        comment.id = String::new();
        comment.approval_status = ApprovalStatus::Pending;
        comment.replies.clear();
        comment.created_at = now;
        comment.updated_at = now;
        let post_id = comment.post_info.post_id.clone();

        let id = self.store.insert(comment).await?;
        info!(comment_id = %id, post_id = %post_id, "Comment added");

        publish_detached(
            &self.bus,
            topics::COMMENT,
            &CommentEvent::comment_created(&post_id, &id),
        );
        webmaster_detached(&self.notifier, templates::COMMENT);
        Ok(id)
    }

    /// Store a new pending reply under an approved comment of `post_id`.
    pub async fn add_reply(
        &self,
        parent_id: &str,
        post_id: &str,
        mut reply: Reply,
    ) -> Result<String> {
        let parent = self.find_comment(parent_id).await?;
        if !parent.approval_status.is_approved() {
            return Err(ServiceError::CommentNotApproved(parent_id.to_string()));
        }
        if parent.post_info.post_id != post_id {
            return Err(ServiceError::InvalidPost(format!(
                "comment {parent_id} does not belong to post {post_id}"
            )));
        }
        validate_website(&reply.user_info.website)?;

        reply.reply_to_id = reply.reply_to_id.filter(|id| !id.is_empty());
        let replied_user = match reply.reply_to_id.as_deref() {
            Some(target_id) => parent
                .find_approved_reply(target_id)
                .map(|target| target.user_info.clone())
                .ok_or_else(|| ServiceError::ReplyTargetNotFound(target_id.to_string()))?,
            None => parent.user_info.clone(),
        };

        let now = Utc::now();
        reply.replied_user_info = Some(replied_user);
        reply.approval_status = ApprovalStatus::Pending;
        reply.created_at = now;
        reply.updated_at = now;
        let reply_id = reply.reply_id.clone();

        self.store
            .push_reply(parent_id, reply)
            .await
            .map_err(|e| match e {
                StorageError::NotFound { .. } => {
                    ServiceError::CommentNotFound(parent_id.to_string())
                }
                other => other.into(),
            })?;
        info!(comment_id = %parent_id, reply_id = %reply_id, "Reply added");

        publish_detached(
            &self.bus,
            topics::COMMENT,
            &CommentEvent::reply_created(post_id, parent_id, &reply_id),
        );
        webmaster_detached(&self.notifier, templates::COMMENT);
        Ok(reply_id)
    }

    pub async fn approve_comment(&self, id: &str) -> Result<()> {
        let comment = self.find_comment(id).await?;
        if comment.approval_status.is_approved() {
            return Err(already_approved("Comment", id));
        }

        // A concurrent approval may have won between the read and the write
        let approved = self.store.approve_comments(&[id.to_string()]).await?;
        if approved.is_empty() {
            return Err(already_approved("Comment", id));
        }
        info!(comment_id = %id, "Comment approved");

        let recipients = email_info(&comment.user_info.email, &comment.post_info.post_url)
            .into_iter()
            .collect();
        users_detached(&self.notifier, templates::USER_COMMENT_APPROVAL, recipients);
        Ok(())
    }

    pub async fn approve_reply(&self, parent_id: &str, reply_id: &str) -> Result<()> {
        let parent = self.find_comment(parent_id).await?;
        let reply = parent
            .find_reply(reply_id)
            .ok_or_else(|| ServiceError::ReplyNotFound(reply_id.to_string()))?;
        if reply.approval_status.is_approved() {
            return Err(already_approved("Comment reply", reply_id));
        }

        let approved = self
            .store
            .approve_replies(parent_id, &[reply_id.to_string()])
            .await?;
        if approved.is_empty() {
            return Err(already_approved("Comment reply", reply_id));
        }
        info!(comment_id = %parent_id, reply_id = %reply_id, "Reply approved");

        let post_url = &parent.post_info.post_url;
        let author = email_info(&reply.user_info.email, post_url);
        let replied = reply
            .replied_user_info
            .as_ref()
            .and_then(|u| email_info(&u.email, post_url));
        users_detached(
            &self.notifier,
            templates::USER_COMMENT_APPROVAL,
            author.into_iter().collect(),
        );
        users_detached(
            &self.notifier,
            templates::USER_COMMENT_REPLY,
            replied.into_iter().collect(),
        );
        Ok(())
    }

    /// Approve many comments and replies at once.
    ///
    /// The top-level comments form one group and each parent's replies
    /// another. Groups run concurrently and fail independently; a failed
    /// group contributes no notices. Already-approved entries are skipped.
    pub async fn batch_approve(
        &self,
        comment_ids: Vec<String>,
        replies: Vec<ReplyGroup>,
    ) -> Result<BatchApproval> {
        let replies: Vec<ReplyGroup> = replies
            .into_iter()
            .filter(|g| !g.reply_ids.is_empty())
            .collect();
        if comment_ids.is_empty() && replies.is_empty() {
            return Err(ServiceError::EmptyBatch);
        }

        let comments_group = async {
            if comment_ids.is_empty() {
                return None;
            }
            Some(self.approve_comment_group(&comment_ids).await)
        };
        let reply_groups = join_all(replies.iter().map(|group| async move {
            (
                group.comment_id.clone(),
                self.approve_reply_group(group).await,
            )
        }));

        let (comments_result, reply_results) = join(comments_group, reply_groups).await;

        let mut outcome = BatchApproval::default();
        let mut collect = |comment_id: Option<String>, result: Result<GroupNotices>| match result {
            Ok(notices) => {
                outcome.approval_emails.extend(notices.approval);
                outcome.replied_emails.extend(notices.replied);
            }
            Err(error) => {
                warn!(comment_id = ?comment_id, error = %error, "Batch approval group failed");
                outcome.failures.push(BatchFailure { comment_id, error });
            }
        };
        if let Some(result) = comments_result {
            collect(None, result);
        }
        for (comment_id, result) in reply_results {
            collect(Some(comment_id), result);
        }

        info!(
            approved = outcome.approval_emails.len(),
            failed_groups = outcome.failures.len(),
            "Batch approval finished"
        );

        users_detached(
            &self.notifier,
            templates::USER_COMMENT_APPROVAL,
            outcome.approval_emails.clone(),
        );
        users_detached(
            &self.notifier,
            templates::USER_COMMENT_REPLY,
            outcome.replied_emails.clone(),
        );
        Ok(outcome)
    }

    async fn approve_comment_group(&self, ids: &[String]) -> Result<GroupNotices> {
        let approved = self.store.approve_comments(ids).await?;
        Ok(GroupNotices {
            approval: approved
                .iter()
                .filter_map(|c| email_info(&c.user_info.email, &c.post_info.post_url))
                .collect(),
            replied: Vec::new(),
        })
    }

    async fn approve_reply_group(&self, group: &ReplyGroup) -> Result<GroupNotices> {
        let approved = self
            .store
            .approve_replies(&group.comment_id, &group.reply_ids)
            .await
            .map_err(|e| match e {
                StorageError::NotFound { .. } => {
                    ServiceError::CommentNotFound(group.comment_id.clone())
                }
                other => other.into(),
            })?;
        if approved.is_empty() {
            return Ok(GroupNotices::default());
        }

        // Read after the write so targets approved in this batch count
        let Some(parent) = self.store.find_by_id(&group.comment_id).await? else {
            return Ok(GroupNotices::default());
        };
        let post_url = &parent.post_info.post_url;

        let mut notices = GroupNotices::default();
        for reply in &approved {
            notices
                .approval
                .extend(email_info(&reply.user_info.email, post_url));

            let target_approved = reply
                .reply_to_id
                .as_deref()
                .is_some_and(|target| parent.find_approved_reply(target).is_some());
            if target_approved {
                let replied = reply
                    .replied_user_info
                    .as_ref()
                    .and_then(|u| email_info(&u.email, post_url));
                notices.replied.extend(replied);
            }
        }
        Ok(notices)
    }

    /// Approved comments of a post with their approved replies, newest first.
    pub async fn find_by_post_id(&self, post_id: &str) -> Result<Vec<Comment>> {
        let comments = self.store.find_by_post_id(post_id).await?;
        Ok(comments
            .iter()
            .filter_map(|c| ModerationFilter::Approved.project(c))
            .collect())
    }

    pub async fn find_moderation_page(&self, query: &CommentQuery) -> Result<CommentPage> {
        Ok(self.store.find_page(query).await?)
    }

    pub async fn find_comment(&self, id: &str) -> Result<Comment> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::CommentNotFound(id.to_string()))
    }

    /// Latest approved comments and replies across all posts, newest first.
    pub async fn find_latest(&self, limit: usize) -> Result<Vec<LatestComment>> {
        let comments = self.store.find_latest_approved(limit).await?;

        let mut latest: Vec<LatestComment> = comments
            .iter()
            .flat_map(|c| {
                let own = LatestComment {
                    comment_id: c.id.clone(),
                    reply_id: None,
                    post_info: c.post_info.clone(),
                    content: c.content.clone(),
                    user_name: c.user_info.name.clone(),
                    created_at: c.created_at,
                };
                let replies = c.replies.iter().map(move |r| LatestComment {
                    comment_id: c.id.clone(),
                    reply_id: Some(r.reply_id.clone()),
                    post_info: c.post_info.clone(),
                    content: r.content.clone(),
                    user_name: r.user_info.name.clone(),
                    created_at: r.created_at,
                });
                std::iter::once(own).chain(replies)
            })
            .collect();
        latest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        latest.truncate(limit);
        Ok(latest)
    }

    /// Comments created at or after `since`.
    pub async fn count_since(&self, since: DateTime<Utc>) -> Result<u64> {
        Ok(self.store.count_created_since(since).await?)
    }

    /// Delete a comment and all its replies.
    pub async fn delete_comment(&self, id: &str) -> Result<()> {
        let removed = self.store.delete_many(&[id.to_string()]).await?;
        let comment = removed
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::CommentNotFound(id.to_string()))?;
        info!(comment_id = %id, replies = comment.replies.len(), "Comment deleted");

        publish_detached(
            &self.bus,
            topics::COMMENT,
            &CommentEvent::comment_deleted(&comment.post_info.post_id, id, reply_ids(&comment)),
        );
        Ok(())
    }

    pub async fn delete_reply(&self, parent_id: &str, reply_id: &str) -> Result<()> {
        let parent = self.find_comment(parent_id).await?;
        let removed = self
            .store
            .delete_replies(parent_id, &[reply_id.to_string()])
            .await?;
        if removed.is_empty() {
            return Err(ServiceError::ReplyNotFound(reply_id.to_string()));
        }
        info!(comment_id = %parent_id, reply_id = %reply_id, "Reply deleted");

        publish_detached(
            &self.bus,
            topics::COMMENT,
            &CommentEvent::replies_deleted(&parent.post_info.post_id, parent_id, removed),
        );
        Ok(())
    }

    /// Delete many comments and reply groups. One event per removed
    /// comment and per reply group that removed anything.
    pub async fn batch_delete(
        &self,
        comment_ids: Vec<String>,
        replies: Vec<ReplyGroup>,
    ) -> Result<BatchDeletion> {
        if comment_ids.is_empty() && replies.iter().all(|g| g.reply_ids.is_empty()) {
            return Err(ServiceError::EmptyBatch);
        }

        let mut outcome = BatchDeletion::default();

        if !comment_ids.is_empty() {
            match self.store.delete_many(&comment_ids).await {
                Ok(removed) => {
                    for comment in &removed {
                        publish_detached(
                            &self.bus,
                            topics::COMMENT,
                            &CommentEvent::comment_deleted(
                                &comment.post_info.post_id,
                                &comment.id,
                                reply_ids(comment),
                            ),
                        );
                    }
                    outcome.comments_deleted = removed.len();
                }
                Err(e) => outcome.failures.push(BatchFailure {
                    comment_id: None,
                    error: e.into(),
                }),
            }
        }

        for group in replies.iter().filter(|g| !g.reply_ids.is_empty()) {
            match self.delete_reply_group(group).await {
                Ok(count) => outcome.replies_deleted += count,
                Err(error) => outcome.failures.push(BatchFailure {
                    comment_id: Some(group.comment_id.clone()),
                    error,
                }),
            }
        }

        info!(
            comments = outcome.comments_deleted,
            replies = outcome.replies_deleted,
            failed_groups = outcome.failures.len(),
            "Batch delete finished"
        );
        Ok(outcome)
    }

    async fn delete_reply_group(&self, group: &ReplyGroup) -> Result<usize> {
        let parent = self.find_comment(&group.comment_id).await?;
        let removed = self
            .store
            .delete_replies(&group.comment_id, &group.reply_ids)
            .await?;
        let count = removed.len();
        if count > 0 {
            publish_detached(
                &self.bus,
                topics::COMMENT,
                &CommentEvent::replies_deleted(
                    &parent.post_info.post_id,
                    &group.comment_id,
                    removed,
                ),
            );
        }
        Ok(count)
    }
}

fn reply_ids(comment: &Comment) -> Vec<String> {
    comment.replies.iter().map(|r| r.reply_id.clone()).collect()
}

fn already_approved(entity: &'static str, id: &str) -> ServiceError {
    ServiceError::AlreadyApproved {
        entity,
        id: id.to_string(),
    }
}

/// Removes the comments of a deleted post.
///
/// No comment events are emitted: the post's `delete` event already
/// carries its comment total for the counters.
pub struct CommentCleanupListener {
    store: Arc<dyn CommentStore>,
}

impl CommentCleanupListener {
    pub fn new(store: Arc<dyn CommentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventListener for CommentCleanupListener {
    type Event = PostEvent;
    type Error = StorageError;

    fn name(&self) -> &'static str {
        "comment-cleanup"
    }

    async fn on_event(&self, event: PostEvent) -> std::result::Result<(), StorageError> {
        if event.event_type != PostEventType::Delete {
            return Ok(());
        }
        let removed = self.store.delete_by_post_id(&event.post_id).await?;
        debug!(post_id = %event.post_id, removed, "Comments of deleted post removed");
        Ok(())
    }
}
