//! In-memory storage implementations.
//!
//! Used by the standalone binary for documents and by tests for everything.
//! Stores that sit on compensation paths expose failure injection flags.

mod comment_store;
mod count_stats_store;
mod file_index_store;
mod like_store;
mod post_store;
mod taxonomy_store;

pub use comment_store::MemoryCommentStore;
pub use count_stats_store::MemoryCountStatsStore;
pub use file_index_store::MemoryFileIndexStore;
pub use like_store::MemoryPostLikeStore;
pub use post_store::MemoryPostStore;
pub use taxonomy_store::MemoryTaxonomyStore;

use super::StorageError;

/// Error returned by an injected failure.
fn injected(operation: &str) -> StorageError {
    StorageError::Unavailable(format!("injected failure on {operation}"))
}
