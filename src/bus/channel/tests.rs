use super::*;
use futures::StreamExt;
use std::time::Duration;

async fn next_payload(stream: &mut EventStream) -> Option<Bytes> {
    tokio::time::timeout(Duration::from_millis(500), stream.next())
        .await
        .ok()
        .flatten()
}

#[tokio::test]
async fn test_channel_publish_no_receivers() {
    let bus = ChannelEventBus::default();

    // Should not error even with no receivers
    let result = bus.publish("post", Bytes::from_static(b"{}")).await.unwrap();
    assert_eq!(result.receivers, 0);
}

#[tokio::test]
async fn test_channel_subscribe_and_receive() {
    let bus = ChannelEventBus::default();
    let mut stream = bus.subscribe("post").await.unwrap();

    let result = bus.publish("post", Bytes::from_static(b"one")).await.unwrap();
    assert_eq!(result.receivers, 1);

    assert_eq!(next_payload(&mut stream).await.unwrap(), Bytes::from_static(b"one"));
}

#[tokio::test]
async fn test_channel_topics_are_isolated() {
    let bus = ChannelEventBus::default();
    let mut posts = bus.subscribe("post").await.unwrap();
    let _comments = bus.subscribe("comment").await.unwrap();

    bus.publish("comment", Bytes::from_static(b"c")).await.unwrap();
    bus.publish("post", Bytes::from_static(b"p")).await.unwrap();

    assert_eq!(next_payload(&mut posts).await.unwrap(), Bytes::from_static(b"p"));
}

#[tokio::test]
async fn test_channel_every_subscriber_sees_every_event_in_order() {
    let bus = ChannelEventBus::default();
    let mut first = bus.subscribe("tag").await.unwrap();
    let mut second = bus.subscribe("tag").await.unwrap();
    assert_eq!(bus.subscriber_count("tag").await, 2);

    for i in 0..5u8 {
        bus.publish("tag", Bytes::from(vec![i])).await.unwrap();
    }

    for stream in [&mut first, &mut second] {
        for i in 0..5u8 {
            assert_eq!(next_payload(stream).await.unwrap(), Bytes::from(vec![i]));
        }
    }
}

#[tokio::test]
async fn test_channel_lagging_subscriber_skips_oldest() {
    let bus = ChannelEventBus::new(ChannelConfig::with_capacity(2));
    let mut stream = bus.subscribe("post").await.unwrap();

    for i in 0..4u8 {
        bus.publish("post", Bytes::from(vec![i])).await.unwrap();
    }

    // Lag is logged and skipped; the newest events survive
    assert_eq!(next_payload(&mut stream).await.unwrap(), Bytes::from(vec![2]));
    assert_eq!(next_payload(&mut stream).await.unwrap(), Bytes::from(vec![3]));
}

#[tokio::test]
async fn test_channel_close_ends_streams() {
    let bus = ChannelEventBus::default();
    let mut stream = bus.subscribe("post").await.unwrap();
    bus.publish("post", Bytes::from_static(b"last")).await.unwrap();

    bus.close().await;

    assert_eq!(next_payload(&mut stream).await.unwrap(), Bytes::from_static(b"last"));
    let end = tokio::time::timeout(Duration::from_millis(500), stream.next())
        .await
        .unwrap();
    assert!(end.is_none());
}
