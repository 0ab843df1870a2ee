//! Domain services.
//!
//! Each service owns one module's writes, publishes that module's events,
//! and exposes the listeners through which it reacts to other modules.

use http::StatusCode;

use crate::storage::StorageError;

pub mod comment;
pub mod count_stats;
pub mod diff;
pub mod file_index;
pub mod like;
pub mod post;
pub mod taxonomy;

pub use comment::{BatchApproval, CommentCleanupListener, CommentService};
pub use count_stats::{
    CountStatsService, WebsiteCommentListener, WebsiteLikeListener, WebsitePostListener,
    WebsiteTaxonomyListener,
};
pub use file_index::{FileIndexListener, FileIndexService};
pub use like::{LikeOutcome, PostLikeService};
pub use post::{PostCommentListener, PostService};
pub use taxonomy::{TaxonomyPostListener, TaxonomyService};

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors surfaced to callers of the services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid post: {0}")]
    InvalidPost(String),

    #[error("Post not found: {0}")]
    PostNotFound(String),

    #[error("Website must start with http:// or https://: {0}")]
    InvalidWebsite(String),

    #[error("Client IP is required")]
    InvalidIp,

    #[error("Comment not found: {0}")]
    CommentNotFound(String),

    #[error("Comment {0} is not approved")]
    CommentNotApproved(String),

    #[error("Reply not found: {0}")]
    ReplyNotFound(String),

    #[error("The replyToId does not exist: {0}")]
    ReplyTargetNotFound(String),

    #[error("{entity} {id} has been approved")]
    AlreadyApproved { entity: &'static str, id: String },

    #[error("Comments are disabled")]
    CommentsDisabled,

    #[error("Invalid counter: {0}")]
    InvalidCounter(String),

    #[error("Nothing to process")]
    EmptyBatch,

    #[error("{kind} not found: {id}")]
    TaxonomyNotFound { kind: &'static str, id: String },

    #[error("A request from this client is already in progress")]
    RequestInProgress,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// HTTP status a handler should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidPost(_)
            | ServiceError::InvalidWebsite(_)
            | ServiceError::InvalidIp
            | ServiceError::ReplyTargetNotFound(_)
            | ServiceError::InvalidCounter(_)
            | ServiceError::EmptyBatch => StatusCode::BAD_REQUEST,
            ServiceError::PostNotFound(_)
            | ServiceError::CommentNotFound(_)
            | ServiceError::ReplyNotFound(_)
            | ServiceError::TaxonomyNotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::CommentNotApproved(_) | ServiceError::CommentsDisabled => {
                StatusCode::FORBIDDEN
            }
            ServiceError::AlreadyApproved { .. } => StatusCode::CONFLICT,
            ServiceError::RequestInProgress => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Storage(StorageError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ServiceError::Storage(StorageError::Duplicate { .. }) => StatusCode::CONFLICT,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `website` is optional, but when given it must be an http(s) URL.
pub(crate) fn validate_website(website: &str) -> Result<()> {
    if website.is_empty() || website.starts_with("http://") || website.starts_with("https://") {
        Ok(())
    } else {
        Err(ServiceError::InvalidWebsite(website.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::InvalidIp.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServiceError::CommentNotFound("c".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::AlreadyApproved { entity: "Comment", id: "c".into() }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Storage(StorageError::Unavailable("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_already_approved_message() {
        let err = ServiceError::AlreadyApproved { entity: "Comment reply", id: "r1".into() };
        assert_eq!(err.to_string(), "Comment reply r1 has been approved");
    }

    #[test]
    fn test_validate_website() {
        assert!(validate_website("").is_ok());
        assert!(validate_website("https://a.dev").is_ok());
        assert!(validate_website("http://a.dev").is_ok());
        assert!(matches!(
            validate_website("ftp://a.dev"),
            Err(ServiceError::InvalidWebsite(_))
        ));
    }
}
