//! Event bus for async delivery between modules.
//!
//! This module contains:
//! - `EventBus` trait: topic-keyed publish/subscribe of opaque payloads
//! - `EventListener` trait and `spawn_listener`: typed subscriber loops
//! - `publish_detached`: fire-and-forget publication
//! - Implementations: Channel (tokio broadcast), Mock

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Deserialize;

pub mod channel;
pub mod dispatch;
pub mod mock;

pub use channel::{ChannelConfig, ChannelEventBus};
pub use dispatch::{publish_detached, spawn_listener, EventListener};
pub use mock::MockEventBus;

/// Topic names. Each consuming module runs one loop per topic it reads.
pub mod topics {
    pub const POST: &str = "post";
    pub const COMMENT: &str = "comment";
    pub const POST_LIKE: &str = "post-like";
    pub const CATEGORY: &str = "category";
    pub const TAG: &str = "tag";
}

// ============================================================================
// Traits
// ============================================================================

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors that can occur during bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Publish to '{topic}' failed: {message}")]
    Publish { topic: String, message: String },

    #[error("Subscribe to '{topic}' failed: {message}")]
    Subscribe { topic: String, message: String },

    #[error("Event encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Subscribe not supported for this bus type")]
    SubscribeNotSupported,
}

/// Result of publishing a payload.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishResult {
    /// Subscribers the payload was handed to. Zero means it was dropped.
    pub receivers: usize,
}

/// Stream of raw payloads for one topic.
pub type EventStream = BoxStream<'static, Bytes>;

/// Interface for in-process event delivery.
///
/// Implementations:
/// - `ChannelEventBus`: tokio broadcast channel per topic
/// - `MockEventBus`: records payloads for tests
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Hand a payload to every current subscriber of `topic`.
    ///
    /// With no subscribers the payload is dropped. Nothing is buffered or
    /// persisted.
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<PublishResult>;

    /// Open a new subscription on `topic`.
    ///
    /// The stream yields payloads in publish order and ends when the bus
    /// closes the topic.
    async fn subscribe(&self, topic: &str) -> Result<EventStream>;
}

// ============================================================================
// Configuration
// ============================================================================

/// Messaging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Per-topic buffer. Subscribers lagging further behind lose the oldest
    /// events.
    pub channel_capacity: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            channel_capacity: channel::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}
