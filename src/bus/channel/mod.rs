//! In-memory channel-based event bus.
//!
//! One tokio broadcast channel per topic, created on first subscription.
//! Every subscriber gets its own receiver, so each consuming module sees
//! every event of the topic in publish order.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, error, info};

use super::{EventBus, EventStream, PublishResult, Result};

/// Default channel capacity per topic.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Configuration for channel event bus.
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Buffered events per topic before slow subscribers start lagging.
    pub capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ChannelConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }
}

/// In-memory event bus using tokio broadcast channels.
pub struct ChannelEventBus {
    /// Broadcast sender per topic.
    senders: RwLock<HashMap<String, broadcast::Sender<Bytes>>>,
    config: ChannelConfig,
}

impl ChannelEventBus {
    /// Create a new channel event bus.
    pub fn new(config: ChannelConfig) -> Self {
        info!(capacity = config.capacity, "Channel event bus initialized");

        Self {
            senders: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Number of live subscribers on a topic.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.senders
            .read()
            .await
            .get(topic)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Drop every topic sender. Open subscription streams end once they
    /// have drained what was already buffered.
    pub async fn close(&self) {
        let topics = {
            let mut senders = self.senders.write().await;
            let count = senders.len();
            senders.clear();
            count
        };
        info!(topics, "Channel event bus closed");
    }
}

impl Default for ChannelEventBus {
    fn default() -> Self {
        Self::new(ChannelConfig::default())
    }
}

#[async_trait]
impl EventBus for ChannelEventBus {
    #[tracing::instrument(name = "bus.publish", skip_all, fields(topic = %topic))]
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<PublishResult> {
        let senders = self.senders.read().await;

        let receivers = match senders.get(topic) {
            // Send only fails when every receiver is gone
            Some(sender) => sender.send(payload).unwrap_or(0),
            None => 0,
        };

        if receivers == 0 {
            debug!(topic = %topic, "Published event (no receivers, dropped)");
        } else {
            debug!(topic = %topic, receivers, "Published event to channel");
        }

        Ok(PublishResult { receivers })
    }

    async fn subscribe(&self, topic: &str) -> Result<EventStream> {
        let receiver = {
            let mut senders = self.senders.write().await;
            senders
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(self.config.capacity).0)
                .subscribe()
        };

        info!(topic = %topic, "Subscribed to channel topic");

        let topic = topic.to_string();
        let stream = BroadcastStream::new(receiver).filter_map(move |item| {
            let payload = match item {
                Ok(payload) => Some(payload),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    error!(topic = %topic, skipped, "Channel subscriber lagged, events lost");
                    None
                }
            };
            futures::future::ready(payload)
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests;
