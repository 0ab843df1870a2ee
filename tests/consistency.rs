//! End-to-end consistency tests.
//!
//! Drive the services through `AppContext` with the channel bus and every
//! listener running, then wait for the denormalized counters to settle.

mod common;

use bytes::Bytes;
use common::*;
use inkpost::bus::{topics, EventBus};
use inkpost::domain::{CountStatsType, TaxonomyKind};
use inkpost::services::{LikeOutcome, ServiceError};

#[tokio::test]
async fn test_post_membership_drives_category_counts() {
    let ctx = bootstrap().await;
    create_taxonomies(&ctx, TaxonomyKind::Category, &["A", "B", "C"]).await;

    // Create P with [A, B]
    let original = ctx
        .posts()
        .add_post(post("P", &["A", "B"], &[], None))
        .await
        .unwrap();
    wait_for_counter(&ctx, CountStatsType::PostCountInCategory, "A", 1).await;
    wait_for_counter(&ctx, CountStatsType::PostCountInCategory, "B", 1).await;
    assert_eq!(counter(&ctx, CountStatsType::PostCountInCategory, "C").await, Some(0));

    // Move P to [B, C]
    ctx.posts()
        .save_post(&original, post("P", &["B", "C"], &[], None), false)
        .await
        .unwrap();
    wait_for_counter(&ctx, CountStatsType::PostCountInCategory, "A", 0).await;
    wait_for_counter(&ctx, CountStatsType::PostCountInCategory, "C", 1).await;
    assert_eq!(counter(&ctx, CountStatsType::PostCountInCategory, "B").await, Some(1));

    wait_for_counter(&ctx, CountStatsType::CategoryCount, "CategoryCount", 3).await;
    wait_for_counter(&ctx, CountStatsType::PostCount, "PostCount", 1).await;

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_reply_threading() {
    let ctx = bootstrap().await;
    ctx.posts().add_post(post("P", &[], &[], None)).await.unwrap();

    let c1 = ctx
        .submit_comment("P", "first", user("ann", "10.0.0.1"))
        .await
        .unwrap();
    ctx.comments().approve_comment(&c1).await.unwrap();
    let author = ctx.comments().find_comment(&c1).await.unwrap().user_info;

    // R1 answers the comment itself
    let r1 = ctx
        .submit_reply(&c1, "P", "second", user("bob", "10.0.0.2"), None)
        .await
        .unwrap();
    let stored = ctx.comments().find_comment(&c1).await.unwrap();
    let r1_reply = stored.find_reply(&r1).unwrap().clone();
    assert_eq!(r1_reply.replied_user_info.as_ref(), Some(&author));

    // R2 cannot target R1 while R1 is pending
    let err = ctx
        .submit_reply(&c1, "P", "third", user("cat", "10.0.0.3"), Some(r1.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ReplyTargetNotFound(_)));

    // Once R1 is approved it can be answered
    ctx.comments().approve_reply(&c1, &r1).await.unwrap();
    let r2 = ctx
        .submit_reply(&c1, "P", "third", user("cat", "10.0.0.3"), Some(r1.clone()))
        .await
        .unwrap();
    let stored = ctx.comments().find_comment(&c1).await.unwrap();
    assert_eq!(
        stored.find_reply(&r2).unwrap().replied_user_info.as_ref(),
        Some(&r1_reply.user_info)
    );

    eventually("post comment_count == 3", || async {
        ctx.posts().find_by_id("P").await.unwrap().comment_count == 3
    })
    .await;
    wait_for_counter(&ctx, CountStatsType::CommentCount, "CommentCount", 3).await;

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_post_delete_releases_everything() {
    let ctx = bootstrap().await;
    create_taxonomies(&ctx, TaxonomyKind::Category, &["A"]).await;
    create_taxonomies(&ctx, TaxonomyKind::Tag, &["t1", "t2"]).await;
    ctx.posts()
        .add_post(post("P", &["A"], &["t1", "t2"], Some("cover")))
        .await
        .unwrap();

    for i in 0..5 {
        ctx.submit_comment("P", "hello", user("ann", &format!("10.0.1.{i}")))
            .await
            .unwrap();
    }
    eventually("post comment_count == 5", || async {
        ctx.posts().find_by_id("P").await.unwrap().comment_count == 5
    })
    .await;
    wait_for_counter(&ctx, CountStatsType::PostCountInTag, "t2", 1).await;
    eventually("cover indexed", || async {
        ctx.files().is_referenced("cover").await.unwrap()
    })
    .await;

    ctx.posts().delete_post("P").await.unwrap();

    wait_for_counter(&ctx, CountStatsType::PostCountInCategory, "A", 0).await;
    wait_for_counter(&ctx, CountStatsType::PostCountInTag, "t1", 0).await;
    wait_for_counter(&ctx, CountStatsType::PostCountInTag, "t2", 0).await;
    wait_for_counter(&ctx, CountStatsType::PostCount, "PostCount", 0).await;
    wait_for_counter(&ctx, CountStatsType::CommentCount, "CommentCount", 0).await;
    eventually("comments removed", || async {
        ctx.comments().find_by_post_id("P").await.unwrap().is_empty()
            && ctx
                .comments()
                .find_moderation_page(&Default::default())
                .await
                .unwrap()
                .total
                == 0
    })
    .await;
    eventually("cover released", || async {
        !ctx.files().is_referenced("cover").await.unwrap()
    })
    .await;

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_likes_count_once_per_client() {
    let ctx = bootstrap().await;
    ctx.posts().add_post(post("P", &[], &[], None)).await.unwrap();

    assert_eq!(
        ctx.likes().like("P", "10.0.0.1", "test").await.unwrap(),
        LikeOutcome::Liked
    );
    assert_eq!(
        ctx.likes().like("P", "10.0.0.1", "test").await.unwrap(),
        LikeOutcome::AlreadyLiked
    );
    ctx.likes().like("P", "10.0.0.2", "test").await.unwrap();

    wait_for_counter(&ctx, CountStatsType::LikeCount, "LikeCount", 2).await;
    assert_eq!(ctx.posts().find_by_id("P").await.unwrap().like_count, 2);

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_comment_counts_commute() {
    let ctx = bootstrap().await;
    ctx.posts().add_post(post("P", &[], &[], None)).await.unwrap();

    let mut ids = Vec::new();
    for i in 0..20 {
        let id = ctx
            .submit_comment("P", "hello", user("ann", &format!("10.0.2.{i}")))
            .await
            .unwrap();
        ids.push(id);
    }
    let deletions = ids
        .iter()
        .take(10)
        .map(|id| ctx.comments().delete_comment(id));
    for result in futures::future::join_all(deletions).await {
        result.unwrap();
    }

    eventually("post comment_count == 10", || async {
        ctx.posts().find_by_id("P").await.unwrap().comment_count == 10
    })
    .await;
    wait_for_counter(&ctx, CountStatsType::CommentCount, "CommentCount", 10).await;

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_listeners_survive_malformed_payloads() {
    let ctx = bootstrap().await;
    create_taxonomies(&ctx, TaxonomyKind::Tag, &["t1"]).await;

    ctx.bus()
        .publish(topics::POST, Bytes::from_static(b"{not json"))
        .await
        .unwrap();
    ctx.posts().add_post(post("P", &[], &["t1"], None)).await.unwrap();

    wait_for_counter(&ctx, CountStatsType::PostCountInTag, "t1", 1).await;

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_taxonomy_lifecycle_updates_website_totals() {
    let ctx = bootstrap().await;
    create_taxonomies(&ctx, TaxonomyKind::Tag, &["t1", "t2"]).await;
    wait_for_counter(&ctx, CountStatsType::TagCount, "TagCount", 2).await;

    ctx.taxonomies(TaxonomyKind::Tag).delete("t1").await.unwrap();

    wait_for_counter(&ctx, CountStatsType::TagCount, "TagCount", 1).await;
    assert_eq!(counter(&ctx, CountStatsType::PostCountInTag, "t1").await, None);
    let totals = ctx.counters().get_website_count_stats().await.unwrap();
    assert_eq!(totals.tag_count, 1);
    assert_eq!(totals.category_count, 0);

    ctx.shutdown().await;
}
