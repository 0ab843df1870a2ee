//! Event envelopes exchanged over the bus.
//!
//! These JSON shapes are the only contract between modules. Field names are
//! stable; optional fields are omitted when empty.

use serde::{Deserialize, Serialize};

use crate::domain::Post;
use crate::services::diff::diff_ids;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostEventType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEvent {
    pub post_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_category_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted_category_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_tag_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted_tag_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<i64>,
    #[serde(rename = "type")]
    pub event_type: PostEventType,
}

impl PostEvent {
    /// Everything the post references counts as added.
    pub fn created(post: &Post) -> Self {
        Self {
            post_id: post.id.clone(),
            added_category_id: post.category_ids(),
            deleted_category_id: Vec::new(),
            added_tag_id: post.tag_ids(),
            deleted_tag_id: Vec::new(),
            new_file_id: post.cover_file_id(),
            old_file_id: None,
            comment_count: None,
            event_type: PostEventType::Create,
        }
    }

    /// Only the membership delta between the two versions.
    pub fn updated(old: &Post, new: &Post) -> Self {
        let categories = diff_ids(&old.category_ids(), &new.category_ids());
        let tags = diff_ids(&old.tag_ids(), &new.tag_ids());
        Self {
            post_id: new.id.clone(),
            added_category_id: categories.added,
            deleted_category_id: categories.removed,
            added_tag_id: tags.added,
            deleted_tag_id: tags.removed,
            new_file_id: new.cover_file_id(),
            old_file_id: old.cover_file_id(),
            comment_count: None,
            event_type: PostEventType::Update,
        }
    }

    /// Everything the post referenced counts as removed.
    pub fn deleted(post: &Post) -> Self {
        Self {
            post_id: post.id.clone(),
            added_category_id: Vec::new(),
            deleted_category_id: post.category_ids(),
            added_tag_id: Vec::new(),
            deleted_tag_id: post.tag_ids(),
            new_file_id: None,
            old_file_id: post.cover_file_id(),
            comment_count: Some(post.comment_count),
            event_type: PostEventType::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentEventType {
    #[serde(alias = "addition")]
    Create,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEvent {
    pub post_id: String,
    pub comment_id: String,
    #[serde(default)]
    pub replies_id: Vec<String>,
    /// Number of entities created or removed.
    pub count: i64,
    #[serde(rename = "type")]
    pub event_type: CommentEventType,
}

impl CommentEvent {
    pub fn comment_created(post_id: &str, comment_id: &str) -> Self {
        Self {
            post_id: post_id.to_string(),
            comment_id: comment_id.to_string(),
            replies_id: Vec::new(),
            count: 1,
            event_type: CommentEventType::Create,
        }
    }

    pub fn reply_created(post_id: &str, comment_id: &str, reply_id: &str) -> Self {
        Self {
            replies_id: vec![reply_id.to_string()],
            ..Self::comment_created(post_id, comment_id)
        }
    }

    /// A comment together with all its replies.
    pub fn comment_deleted(post_id: &str, comment_id: &str, reply_ids: Vec<String>) -> Self {
        Self {
            post_id: post_id.to_string(),
            comment_id: comment_id.to_string(),
            count: 1 + reply_ids.len() as i64,
            replies_id: reply_ids,
            event_type: CommentEventType::Delete,
        }
    }

    pub fn replies_deleted(post_id: &str, comment_id: &str, reply_ids: Vec<String>) -> Self {
        Self {
            post_id: post_id.to_string(),
            comment_id: comment_id.to_string(),
            count: reply_ids.len() as i64,
            replies_id: reply_ids,
            event_type: CommentEventType::Delete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikePostEvent {
    pub post_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyEventType {
    Create,
    Delete,
}

/// Category or tag lifecycle; the topic tells which.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: TaxonomyEventType,
}
