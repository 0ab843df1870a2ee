//! Comment aggregate: a top-level comment with its embedded replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderation state of a comment or reply.
///
/// Only two states exist. Older data models also carried `Hidden` and
/// `Rejected`; those are not represented here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
}

impl ApprovalStatus {
    pub fn is_approved(self) -> bool {
        matches!(self, ApprovalStatus::Approved)
    }
}

impl From<bool> for ApprovalStatus {
    fn from(approved: bool) -> Self {
        if approved {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Pending
        }
    }
}

/// Author of a comment or reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
    pub ip: String,
    pub website: String,
}

/// Post snapshot taken when the comment is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostInfo {
    pub post_id: String,
    pub post_title: String,
    pub post_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub reply_id: String,
    pub content: String,
    /// Id of another reply in the same comment this one answers.
    pub reply_to_id: Option<String>,
    pub user_info: UserInfo,
    pub replied_user_info: Option<UserInfo>,
    pub approval_status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reply {
    /// New pending reply with a fresh id. `replied_user_info` is resolved
    /// by the moderation engine.
    pub fn new(
        content: impl Into<String>,
        user_info: UserInfo,
        reply_to_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            reply_id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            reply_to_id: reply_to_id.filter(|id| !id.is_empty()),
            user_info,
            replied_user_info: None,
            approval_status: ApprovalStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Assigned by the store on creation; empty until then.
    pub id: String,
    pub post_info: PostInfo,
    pub content: String,
    pub user_info: UserInfo,
    pub approval_status: ApprovalStatus,
    pub replies: Vec<Reply>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post_info: PostInfo, content: impl Into<String>, user_info: UserInfo) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            post_info,
            content: content.into(),
            user_info,
            approval_status: ApprovalStatus::Pending,
            replies: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn find_reply(&self, reply_id: &str) -> Option<&Reply> {
        self.replies.iter().find(|r| r.reply_id == reply_id)
    }

    pub fn find_approved_reply(&self, reply_id: &str) -> Option<&Reply> {
        self.find_reply(reply_id)
            .filter(|r| r.approval_status.is_approved())
    }

    /// Copy of this comment keeping only the replies matching `keep`.
    pub fn with_replies(&self, keep: impl Fn(&Reply) -> bool) -> Comment {
        Comment {
            replies: self.replies.iter().filter(|r| keep(r)).cloned().collect(),
            ..self.clone()
        }
    }
}

/// Filter applied by the moderation listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModerationFilter {
    /// Every comment with every reply.
    #[default]
    All,
    /// Approved comments, approved replies only.
    Approved,
    /// Unapproved comments, or approved comments with at least one
    /// unapproved reply. Replies are narrowed to the unapproved ones.
    NeedsAttention,
}

impl ModerationFilter {
    pub fn from_approval(approval: Option<bool>) -> Self {
        match approval {
            None => ModerationFilter::All,
            Some(true) => ModerationFilter::Approved,
            Some(false) => ModerationFilter::NeedsAttention,
        }
    }

    /// Project a comment through the filter. `None` means it does not match.
    pub fn project(self, comment: &Comment) -> Option<Comment> {
        match self {
            ModerationFilter::All => Some(comment.clone()),
            ModerationFilter::Approved => comment
                .approval_status
                .is_approved()
                .then(|| comment.with_replies(|r| r.approval_status.is_approved())),
            ModerationFilter::NeedsAttention => {
                let pending = comment.with_replies(|r| !r.approval_status.is_approved());
                if !comment.approval_status.is_approved() || !pending.replies.is_empty() {
                    Some(pending)
                } else {
                    None
                }
            }
        }
    }
}

/// Page request for the moderation listing.
#[derive(Debug, Clone, Default)]
pub struct CommentQuery {
    pub filter: ModerationFilter,
    pub skip: usize,
    pub size: usize,
    /// Case-insensitive match on comment content.
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub total: usize,
}

/// Replies of one parent addressed by a batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyGroup {
    pub comment_id: String,
    pub reply_ids: Vec<String>,
}

impl ReplyGroup {
    pub fn new(comment_id: impl Into<String>, reply_ids: Vec<String>) -> Self {
        Self {
            comment_id: comment_id.into(),
            reply_ids,
        }
    }
}

/// Recipient of a user notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailInfo {
    pub email: String,
    pub post_url: String,
}

/// Flattened comment or reply for the "latest comments" widget.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestComment {
    pub comment_id: String,
    pub reply_id: Option<String>,
    pub post_info: PostInfo,
    pub content: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}
