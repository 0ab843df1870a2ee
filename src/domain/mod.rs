//! Domain model shared by the services and stores.
//!
//! These are plain value types. Snapshots embedded in other entities
//! (`PostInfo` inside a comment, `replied_user_info` inside a reply) are
//! copies taken at write time, never live references.

pub mod comment;
pub mod count_stats;
pub mod post;
pub mod taxonomy;

pub use comment::{
    ApprovalStatus, Comment, CommentPage, CommentQuery, EmailInfo, LatestComment,
    ModerationFilter, PostInfo, Reply, ReplyGroup, UserInfo,
};
pub use count_stats::{CountStats, CountStatsType, WebsiteCountStats};
pub use post::{CategoryRef, CoverImage, Post, PostLike, TagRef};
pub use taxonomy::{Taxonomy, TaxonomyKind, TaxonomyWithCount};

/// Entity type recorded in the file index for post covers.
pub const FILE_ENTITY_POST: &str = "post";

/// A file referenced by an entity (post cover, attachment).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileReference {
    pub file_id: String,
    pub entity_id: String,
    pub entity_type: String,
}
