//! Storage interfaces and implementations.
//!
//! Document stores (comments, posts, taxonomies, likes, file index) are
//! in-memory. The counter store has an in-memory and a SQLite backend,
//! selected by configuration.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::domain::count_stats::UnknownCountStatsType;
use crate::domain::{
    Comment, CommentPage, CommentQuery, CountStats, CountStatsType, FileReference, Post,
    PostLike, Reply, Taxonomy, TaxonomyKind,
};

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::{
    MemoryCommentStore, MemoryCountStatsStore, MemoryFileIndexStore, MemoryPostLikeStore,
    MemoryPostStore, MemoryTaxonomyStore,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCountStatsStore;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {key}")]
    Duplicate { entity: &'static str, key: String },

    #[error(transparent)]
    InvalidCountStatsType(#[from] UnknownCountStatsType),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StorageError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Comment aggregates, replies embedded.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Persist a new comment and return the id assigned to it.
    async fn insert(&self, comment: Comment) -> Result<String>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Comment>>;

    /// Append a reply. `NotFound` if the comment is gone.
    async fn push_reply(&self, comment_id: &str, reply: Reply) -> Result<()>;

    /// Approve the listed comments. Returns only those that were pending.
    async fn approve_comments(&self, ids: &[String]) -> Result<Vec<Comment>>;

    /// Approve replies of one comment. Returns only those that were pending.
    /// `NotFound` if the comment is gone.
    async fn approve_replies(&self, comment_id: &str, reply_ids: &[String]) -> Result<Vec<Reply>>;

    /// Remove comments, returning what was removed.
    async fn delete_many(&self, ids: &[String]) -> Result<Vec<Comment>>;

    /// Remove replies of one comment, returning the ids actually removed.
    async fn delete_replies(&self, comment_id: &str, reply_ids: &[String]) -> Result<Vec<String>>;

    /// Remove every comment of a post. Returns how many were removed.
    async fn delete_by_post_id(&self, post_id: &str) -> Result<u64>;

    /// All comments of a post regardless of state, newest first.
    async fn find_by_post_id(&self, post_id: &str) -> Result<Vec<Comment>>;

    /// Moderation listing, newest first.
    async fn find_page(&self, query: &CommentQuery) -> Result<CommentPage>;

    /// Approved comments with approved replies only, ordered by their most
    /// recent approved activity.
    async fn find_latest_approved(&self, limit: usize) -> Result<Vec<Comment>>;

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64>;
}

/// Counter fields kept on the post document itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostCounter {
    Comment,
    Visit,
    Like,
}

/// Boolean flags on the post document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFlag {
    Displayed,
    CommentAllowed,
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// `Duplicate` if the id is taken.
    async fn insert(&self, post: &Post) -> Result<()>;

    /// Replace a stored post. `NotFound` if missing.
    async fn update(&self, post: &Post) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Post>>;

    /// Returns whether a post was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Add `delta` to one counter field. `NotFound` if missing.
    async fn add_to_counter(&self, id: &str, counter: PostCounter, delta: i64) -> Result<()>;

    async fn set_flag(&self, id: &str, flag: PostFlag, value: bool) -> Result<()>;
}

#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    /// `Duplicate` if an entity of the same kind has the id or the name.
    async fn insert(&self, taxonomy: &Taxonomy) -> Result<()>;

    async fn find_by_id(&self, kind: TaxonomyKind, id: &str) -> Result<Option<Taxonomy>>;

    async fn find_all(&self, kind: TaxonomyKind) -> Result<Vec<Taxonomy>>;

    async fn delete(&self, kind: TaxonomyKind, id: &str) -> Result<bool>;
}

/// Keyed counters.
///
/// Adjustments only touch rows that exist; a missing row is never created
/// implicitly. Return values are the number of rows touched.
#[async_trait]
pub trait CountStatsStore: Send + Sync {
    /// `Duplicate` if the `(type, reference_id)` row exists.
    async fn create(&self, stats: &CountStats) -> Result<()>;

    /// Add `delta` to every listed row of `stats_type`.
    async fn adjust_by_reference_ids(
        &self,
        reference_ids: &[String],
        stats_type: CountStatsType,
        delta: i64,
    ) -> Result<u64>;

    async fn get_by_reference_ids_and_type(
        &self,
        reference_ids: &[String],
        stats_type: CountStatsType,
    ) -> Result<Vec<CountStats>>;

    /// Rows of the given types, any reference id.
    async fn get_by_types(&self, types: &[CountStatsType]) -> Result<Vec<CountStats>>;

    async fn delete_by_reference_id(
        &self,
        reference_id: &str,
        stats_type: CountStatsType,
    ) -> Result<u64>;

    async fn increase_by_reference_ids(
        &self,
        reference_ids: &[String],
        stats_type: CountStatsType,
        count: i64,
    ) -> Result<u64> {
        self.adjust_by_reference_ids(reference_ids, stats_type, count)
            .await
    }

    async fn decrease_by_reference_ids(
        &self,
        reference_ids: &[String],
        stats_type: CountStatsType,
        count: i64,
    ) -> Result<u64> {
        self.adjust_by_reference_ids(reference_ids, stats_type, -count)
            .await
    }
}

#[async_trait]
pub trait PostLikeStore: Send + Sync {
    /// `Duplicate` if `(post_id, ip)` already liked.
    async fn insert(&self, like: &PostLike) -> Result<()>;

    async fn find(&self, post_id: &str, ip: &str) -> Result<Option<PostLike>>;

    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait FileIndexStore: Send + Sync {
    /// Idempotent.
    async fn index(&self, reference: &FileReference) -> Result<()>;

    async fn unindex(&self, reference: &FileReference) -> Result<u64>;

    async fn find_by_file_id(&self, file_id: &str) -> Result<Vec<FileReference>>;
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the counter store based on configuration.
pub async fn init_count_stats_store(config: &StorageConfig) -> Result<Arc<dyn CountStatsStore>> {
    info!(storage_type = ?config.storage_type, path = %config.path, "Counter storage");

    match config.storage_type {
        StorageType::Memory => Ok(Arc::new(MemoryCountStatsStore::new())),
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            let store = SqliteCountStatsStore::connect(&config.path).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => {
            tracing::error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err(StorageError::Unavailable(
                "sqlite feature not enabled".to_string(),
            ))
        }
    }
}
