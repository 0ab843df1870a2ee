//! Shared utilities for integration tests.
//!
//! Builders for posts and authors, and polling helpers for state that
//! listeners update after a mutation has already returned.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use inkpost::app::{AppContext, Stores};
use inkpost::config::Config;
use inkpost::domain::{
    CategoryRef, CountStatsType, CoverImage, Post, TagRef, Taxonomy, TaxonomyKind, UserInfo,
};
use inkpost::notify::LogNotifier;

/// How long listeners get to catch up before a test fails.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn bootstrap() -> AppContext {
    AppContext::bootstrap(&Config::for_test(), Stores::in_memory(), Arc::new(LogNotifier))
        .await
        .expect("Failed to bootstrap application")
}

pub fn user(name: &str, ip: &str) -> UserInfo {
    UserInfo {
        name: name.to_string(),
        email: format!("{name}@example.com"),
        ip: ip.to_string(),
        website: String::new(),
    }
}

pub fn post(id: &str, categories: &[&str], tags: &[&str], cover_file: Option<&str>) -> Post {
    let mut post = Post::new(format!("Post {id}"));
    post.id = id.to_string();
    post.categories = categories
        .iter()
        .map(|c| CategoryRef {
            id: c.to_string(),
            name: c.to_string(),
        })
        .collect();
    post.tags = tags
        .iter()
        .map(|t| TagRef {
            id: t.to_string(),
            name: t.to_string(),
        })
        .collect();
    post.cover = cover_file.map(|f| CoverImage {
        url: format!("/static/{f}.png"),
        file_id: f.to_string(),
    });
    post
}

/// Create categories or tags with fixed ids.
pub async fn create_taxonomies(ctx: &AppContext, kind: TaxonomyKind, ids: &[&str]) {
    for id in ids {
        let taxonomy = Taxonomy {
            id: id.to_string(),
            ..Taxonomy::new(kind, *id, id.to_lowercase())
        };
        ctx.taxonomies(kind)
            .create(taxonomy)
            .await
            .expect("Failed to create taxonomy");
    }
}

/// Current value of one counter row.
pub async fn counter(
    ctx: &AppContext,
    stats_type: CountStatsType,
    reference_id: &str,
) -> Option<i64> {
    ctx.counters()
        .get_by_reference_ids_and_type(&[reference_id.to_string()], stats_type)
        .await
        .expect("Failed to read counter")
        .first()
        .map(|row| row.count)
}

/// Poll `check` until it holds or `SETTLE_TIMEOUT` passes.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + SETTLE_TIMEOUT;
    while !check().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for: {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Wait until a counter row reaches `expected`.
pub async fn wait_for_counter(
    ctx: &AppContext,
    stats_type: CountStatsType,
    reference_id: &str,
    expected: i64,
) {
    let what = format!("{stats_type}/{reference_id} == {expected}");
    eventually(&what, || async {
        counter(ctx, stats_type, reference_id).await == Some(expected)
    })
    .await;
}
