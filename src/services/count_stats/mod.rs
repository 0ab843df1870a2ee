//! Counter service and the listeners that keep website totals current.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Result, ServiceError};
use crate::bus::EventListener;
use crate::domain::{CountStats, CountStatsType, TaxonomyKind, WebsiteCountStats};
use crate::events::{
    CommentEvent, CommentEventType, LikePostEvent, PostEvent, PostEventType, TaxonomyEvent,
    TaxonomyEventType,
};
use crate::storage::{CountStatsStore, StorageError};

#[derive(Clone)]
pub struct CountStatsService {
    store: Arc<dyn CountStatsStore>,
}

impl CountStatsService {
    pub fn new(store: Arc<dyn CountStatsStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CountStatsStore> {
        &self.store
    }

    /// Create a counter row. Website-level rows must be keyed by their
    /// type name; every other row needs a reference id.
    pub async fn create(&self, stats: CountStats) -> Result<()> {
        if stats.reference_id.is_empty() {
            return Err(ServiceError::InvalidCounter(format!(
                "{} requires a reference id",
                stats.stats_type
            )));
        }
        if stats.stats_type.is_website_level() && stats.reference_id != stats.stats_type.as_str() {
            return Err(ServiceError::InvalidCounter(format!(
                "{} is keyed by its type name, got {}",
                stats.stats_type, stats.reference_id
            )));
        }
        self.store.create(&stats).await?;
        debug!(
            stats_type = %stats.stats_type,
            reference_id = %stats.reference_id,
            "Counter created"
        );
        Ok(())
    }

    pub async fn increase_by_reference_id(
        &self,
        reference_id: &str,
        stats_type: CountStatsType,
    ) -> Result<()> {
        self.increase_by_reference_ids(&[reference_id.to_string()], stats_type)
            .await
    }

    pub async fn decrease_by_reference_id(
        &self,
        reference_id: &str,
        stats_type: CountStatsType,
        count: i64,
    ) -> Result<()> {
        self.store
            .decrease_by_reference_ids(&[reference_id.to_string()], stats_type, count)
            .await?;
        Ok(())
    }

    /// Add one to each listed counter. Missing rows are left alone.
    pub async fn increase_by_reference_ids(
        &self,
        reference_ids: &[String],
        stats_type: CountStatsType,
    ) -> Result<()> {
        if reference_ids.is_empty() {
            return Ok(());
        }
        let touched = self
            .store
            .increase_by_reference_ids(reference_ids, stats_type, 1)
            .await?;
        log_untouched(reference_ids.len(), touched, stats_type);
        Ok(())
    }

    /// Subtract one from each listed counter. Missing rows are left alone.
    pub async fn decrease_by_reference_ids(
        &self,
        reference_ids: &[String],
        stats_type: CountStatsType,
    ) -> Result<()> {
        if reference_ids.is_empty() {
            return Ok(());
        }
        let touched = self
            .store
            .decrease_by_reference_ids(reference_ids, stats_type, 1)
            .await?;
        log_untouched(reference_ids.len(), touched, stats_type);
        Ok(())
    }

    pub async fn get_by_reference_ids_and_type(
        &self,
        reference_ids: &[String],
        stats_type: CountStatsType,
    ) -> Result<Vec<CountStats>> {
        Ok(self
            .store
            .get_by_reference_ids_and_type(reference_ids, stats_type)
            .await?)
    }

    pub async fn delete_by_reference_id(
        &self,
        reference_id: &str,
        stats_type: CountStatsType,
    ) -> Result<()> {
        self.store
            .delete_by_reference_id(reference_id, stats_type)
            .await?;
        Ok(())
    }

    pub async fn get_website_count_stats(&self) -> Result<WebsiteCountStats> {
        let rows = self.store.get_by_types(&CountStatsType::WEBSITE).await?;
        let mut stats = WebsiteCountStats::default();
        for row in rows {
            stats.set_count_by_type(row.stats_type, row.count);
        }
        Ok(stats)
    }

    /// Create any website-level row that does not exist yet. Returns how
    /// many were created.
    pub async fn init_website_counters(&self) -> Result<usize> {
        let mut created = 0;
        for stats_type in CountStatsType::WEBSITE {
            match self.store.create(&CountStats::website(stats_type)).await {
                Ok(()) => created += 1,
                Err(StorageError::Duplicate { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!(created, "Website counters initialized");
        Ok(created)
    }
}

fn log_untouched(requested: usize, touched: u64, stats_type: CountStatsType) {
    if (touched as usize) < requested {
        debug!(
            %stats_type,
            requested,
            touched,
            "Some counters have no row"
        );
    }
}

async fn adjust_website(
    store: &dyn CountStatsStore,
    stats_type: CountStatsType,
    delta: i64,
) -> std::result::Result<(), StorageError> {
    let key = [stats_type.as_str().to_string()];
    store.adjust_by_reference_ids(&key, stats_type, delta).await?;
    debug!(%stats_type, delta, "Website counter adjusted");
    Ok(())
}

/// Website post total, and comment total when a post goes away with its
/// comments.
pub struct WebsitePostListener {
    store: Arc<dyn CountStatsStore>,
}

impl WebsitePostListener {
    pub fn new(store: Arc<dyn CountStatsStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventListener for WebsitePostListener {
    type Event = PostEvent;
    type Error = StorageError;

    fn name(&self) -> &'static str {
        "website-post-count"
    }

    async fn on_event(&self, event: PostEvent) -> std::result::Result<(), StorageError> {
        match event.event_type {
            PostEventType::Create => {
                adjust_website(self.store.as_ref(), CountStatsType::PostCount, 1).await
            }
            PostEventType::Update => Ok(()),
            PostEventType::Delete => {
                adjust_website(self.store.as_ref(), CountStatsType::PostCount, -1).await?;
                match event.comment_count {
                    Some(n) if n > 0 => {
                        adjust_website(self.store.as_ref(), CountStatsType::CommentCount, -n)
                            .await
                    }
                    _ => Ok(()),
                }
            }
        }
    }
}

pub struct WebsiteCommentListener {
    store: Arc<dyn CountStatsStore>,
}

impl WebsiteCommentListener {
    pub fn new(store: Arc<dyn CountStatsStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventListener for WebsiteCommentListener {
    type Event = CommentEvent;
    type Error = StorageError;

    fn name(&self) -> &'static str {
        "website-comment-count"
    }

    async fn on_event(&self, event: CommentEvent) -> std::result::Result<(), StorageError> {
        let delta = match event.event_type {
            CommentEventType::Create => 1,
            CommentEventType::Delete => -event.count,
        };
        adjust_website(self.store.as_ref(), CountStatsType::CommentCount, delta).await
    }
}

/// Website category or tag total.
pub struct WebsiteTaxonomyListener {
    kind: TaxonomyKind,
    store: Arc<dyn CountStatsStore>,
}

impl WebsiteTaxonomyListener {
    pub fn new(kind: TaxonomyKind, store: Arc<dyn CountStatsStore>) -> Self {
        Self { kind, store }
    }
}

#[async_trait]
impl EventListener for WebsiteTaxonomyListener {
    type Event = TaxonomyEvent;
    type Error = StorageError;

    fn name(&self) -> &'static str {
        match self.kind {
            TaxonomyKind::Category => "website-category-count",
            TaxonomyKind::Tag => "website-tag-count",
        }
    }

    async fn on_event(&self, event: TaxonomyEvent) -> std::result::Result<(), StorageError> {
        let delta = match event.event_type {
            TaxonomyEventType::Create => 1,
            TaxonomyEventType::Delete => -1,
        };
        adjust_website(self.store.as_ref(), self.kind.website_count_type(), delta).await
    }
}

pub struct WebsiteLikeListener {
    store: Arc<dyn CountStatsStore>,
}

impl WebsiteLikeListener {
    pub fn new(store: Arc<dyn CountStatsStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventListener for WebsiteLikeListener {
    type Event = LikePostEvent;
    type Error = StorageError;

    fn name(&self) -> &'static str {
        "website-like-count"
    }

    async fn on_event(&self, event: LikePostEvent) -> std::result::Result<(), StorageError> {
        debug!(post_id = %event.post_id, "Post liked");
        adjust_website(self.store.as_ref(), CountStatsType::LikeCount, 1).await
    }
}
