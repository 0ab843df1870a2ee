//! Mock event bus implementation for testing.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use super::{BusError, EventBus, EventStream, PublishResult, Result};

/// Mock event bus for testing. Records every payload instead of
/// delivering it.
#[derive(Default)]
pub struct MockEventBus {
    published: RwLock<Vec<(String, Bytes)>>,
    fail_on_publish: RwLock<bool>,
}

impl MockEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_publish(&self, fail: bool) {
        *self.fail_on_publish.write().await = fail;
    }

    pub async fn published_count(&self) -> usize {
        self.published.read().await.len()
    }

    pub async fn published_on(&self, topic: &str) -> Vec<Bytes> {
        self.published
            .read()
            .await
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Decode every payload recorded on `topic`. Panics on bad JSON.
    pub async fn decode_published<E: DeserializeOwned>(&self, topic: &str) -> Vec<E> {
        self.published_on(topic)
            .await
            .iter()
            .map(|payload| match serde_json::from_slice(payload) {
                Ok(event) => event,
                Err(e) => panic!("undecodable payload on '{topic}': {e}"),
            })
            .collect()
    }

    /// Wait until at least `count` payloads were recorded on `topic`.
    /// Detached publishes land asynchronously. Panics after one second.
    pub async fn wait_for_published(&self, topic: &str, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while self.published_on(topic).await.len() < count {
            if tokio::time::Instant::now() >= deadline {
                panic!("timed out waiting for {count} events on '{topic}'");
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub async fn take_published(&self) -> Vec<(String, Bytes)> {
        std::mem::take(&mut *self.published.write().await)
    }
}

#[async_trait]
impl EventBus for MockEventBus {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<PublishResult> {
        if *self.fail_on_publish.read().await {
            return Err(BusError::Publish {
                topic: topic.to_string(),
                message: "Mock publish failure".to_string(),
            });
        }
        self.published
            .write()
            .await
            .push((topic.to_string(), payload));
        Ok(PublishResult { receivers: 0 })
    }

    async fn subscribe(&self, _topic: &str) -> Result<EventStream> {
        Err(BusError::SubscribeNotSupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_event_bus_publish() {
        let bus = MockEventBus::new();

        bus.publish("post", Bytes::from_static(b"{}")).await.unwrap();

        assert_eq!(bus.published_count().await, 1);
        assert_eq!(bus.published_on("post").await.len(), 1);
        assert!(bus.published_on("comment").await.is_empty());
    }

    #[tokio::test]
    async fn test_mock_event_bus_fail_on_publish() {
        let bus = MockEventBus::new();
        bus.set_fail_on_publish(true).await;

        let result = bus.publish("post", Bytes::from_static(b"{}")).await;

        assert!(matches!(result, Err(BusError::Publish { .. })));
    }

    #[tokio::test]
    async fn test_mock_event_bus_subscribe_not_supported() {
        let bus = MockEventBus::new();
        let result = bus.subscribe("post").await;
        assert!(matches!(result, Err(BusError::SubscribeNotSupported)));
    }

    #[tokio::test]
    async fn test_mock_event_bus_take_published_drains() {
        let bus = MockEventBus::new();
        bus.publish("tag", Bytes::from_static(b"1")).await.unwrap();

        let taken = bus.take_published().await;

        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].0, "tag");
        assert_eq!(bus.published_count().await, 0);
    }
}
