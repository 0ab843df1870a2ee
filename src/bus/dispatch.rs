//! Listener dispatch utilities.
//!
//! Bridges raw bus payloads to typed listeners, and typed events to raw
//! payloads for fire-and-forget publication.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, Instrument};

use super::{EventBus, Result};

/// A module's reaction to the events of one topic.
#[async_trait]
pub trait EventListener: Send + Sync + 'static {
    type Event: DeserializeOwned + Send;
    type Error: Display + Send;

    /// Name used in logs.
    fn name(&self) -> &'static str;

    async fn on_event(&self, event: Self::Event) -> std::result::Result<(), Self::Error>;
}

/// Subscribe `listener` to `topic` and drive it from a background task.
///
/// The subscription exists once this returns, so events published after
/// the call are seen. Events are handled one at a time in publish order.
/// Decode and handler failures are logged with the raw payload and the
/// loop moves on. The task ends when the bus closes the topic.
pub async fn spawn_listener<L: EventListener>(
    bus: &dyn EventBus,
    topic: &str,
    listener: Arc<L>,
) -> Result<JoinHandle<()>> {
    let mut stream = bus.subscribe(topic).await?;
    let topic = topic.to_string();

    info!(listener = listener.name(), topic = %topic, "Listener started");

    Ok(tokio::spawn(async move {
        while let Some(payload) = stream.next().await {
            let span = tracing::info_span!(
                "bus.listen",
                listener = listener.name(),
                topic = %topic,
                request_id = %uuid::Uuid::new_v4(),
            );
            dispatch_one(listener.as_ref(), &payload)
                .instrument(span)
                .await;
        }
        info!(listener = listener.name(), topic = %topic, "Listener stopped");
    }))
}

/// Decode and handle a single payload.
///
/// Returns `true` if the listener accepted the event.
pub async fn dispatch_one<L: EventListener + ?Sized>(listener: &L, payload: &[u8]) -> bool {
    let event: L::Event = match serde_json::from_slice(payload) {
        Ok(event) => event,
        Err(e) => {
            error!(
                error = %e,
                payload = %String::from_utf8_lossy(payload),
                "Failed to decode event"
            );
            return false;
        }
    };

    match listener.on_event(event).await {
        Ok(()) => {
            debug!("Event handled");
            true
        }
        Err(e) => {
            error!(
                error = %e,
                payload = %String::from_utf8_lossy(payload),
                "Listener failed to handle event"
            );
            false
        }
    }
}

/// Serialize `event` and publish it from a detached task.
///
/// Serialization happens before returning; the publish itself may complete
/// after the caller has moved on. Publish errors are logged only.
pub fn publish_detached<E: Serialize>(bus: &Arc<dyn EventBus>, topic: &str, event: &E) {
    let payload = match serde_json::to_vec(event) {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) => {
            error!(topic = %topic, error = %e, "Failed to encode event");
            return;
        }
    };

    let bus = Arc::clone(bus);
    let topic = topic.to_string();
    tokio::spawn(async move {
        if let Err(e) = bus.publish(&topic, payload).await {
            error!(topic = %topic, error = %e, "Failed to publish event");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{ChannelEventBus, MockEventBus};
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Ping {
        n: u32,
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<u32>>,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl EventListener for Recorder {
        type Event = Ping;
        type Error = String;

        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn on_event(&self, event: Ping) -> std::result::Result<(), String> {
            if event.n == 13 {
                self.failures.fetch_add(1, Ordering::SeqCst);
                return Err("unlucky".to_string());
            }
            self.seen.lock().await.push(event.n);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_one_rejects_bad_payload() {
        let recorder = Recorder::default();
        assert!(!dispatch_one(&recorder, b"not json").await);
        assert!(dispatch_one(&recorder, br#"{"n":1}"#).await);
        assert!(!dispatch_one(&recorder, br#"{"n":13}"#).await);
        assert_eq!(*recorder.seen.lock().await, vec![1]);
    }

    #[tokio::test]
    async fn test_spawn_listener_survives_failures() {
        let bus = Arc::new(ChannelEventBus::default());
        let recorder = Arc::new(Recorder::default());
        let handle = spawn_listener(bus.as_ref(), "ping", Arc::clone(&recorder))
            .await
            .unwrap();

        let payloads: [&[u8]; 4] = [br#"{"n":1}"#, b"garbage", br#"{"n":13}"#, br#"{"n":2}"#];
        for payload in payloads {
            bus.publish("ping", Bytes::copy_from_slice(payload)).await.unwrap();
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*recorder.seen.lock().await, vec![1, 2]);
        assert_eq!(recorder.failures.load(Ordering::SeqCst), 1);

        bus.close().await;
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_publish_detached_reaches_bus() {
        let mock = Arc::new(MockEventBus::new());
        let bus: Arc<dyn EventBus> = mock.clone();

        publish_detached(&bus, "ping", &Ping { n: 7 });

        mock.wait_for_published("ping", 1).await;
        let events: Vec<Ping> = mock.decode_published("ping").await;
        assert_eq!(events, vec![Ping { n: 7 }]);
    }

    #[tokio::test]
    async fn test_publish_detached_swallows_errors() {
        let mock = Arc::new(MockEventBus::new());
        mock.set_fail_on_publish(true).await;
        let bus: Arc<dyn EventBus> = mock.clone();

        publish_detached(&bus, "ping", &Ping { n: 7 });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(mock.published_count().await, 0);
    }
}
