//! Posts and their likes.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: String,
    pub name: String,
}

/// Cover image with the id of the stored file it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverImage {
    pub url: String,
    pub file_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub categories: Vec<CategoryRef>,
    pub tags: Vec<TagRef>,
    pub cover: Option<CoverImage>,
    pub comment_count: i64,
    pub visit_count: i64,
    pub like_count: i64,
    pub is_displayed: bool,
    pub is_comment_allowed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            title: title.into(),
            categories: Vec::new(),
            tags: Vec::new(),
            cover: None,
            comment_count: 0,
            visit_count: 0,
            like_count: 0,
            is_displayed: true,
            is_comment_allowed: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Category ids in listed order, each once.
    pub fn category_ids(&self) -> Vec<String> {
        unique_ids(self.categories.iter().map(|c| c.id.as_str()))
    }

    /// Tag ids in listed order, each once.
    pub fn tag_ids(&self) -> Vec<String> {
        unique_ids(self.tags.iter().map(|t| t.id.as_str()))
    }

    pub fn cover_file_id(&self) -> Option<String> {
        self.cover
            .as_ref()
            .map(|c| c.file_id.clone())
            .filter(|id| !id.is_empty())
    }
}

/// One like per `(post_id, ip)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLike {
    pub id: String,
    pub post_id: String,
    pub ip: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

impl PostLike {
    pub fn new(
        post_id: impl Into<String>,
        ip: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            post_id: post_id.into(),
            ip: ip.into(),
            user_agent: user_agent.into(),
            created_at: Utc::now(),
        }
    }
}

fn unique_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).map(str::to_string).collect()
}
