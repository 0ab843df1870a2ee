//! Categories and tags.
//!
//! Each entity owns a per-entity post counter row. The row is created and
//! removed together with the entity; a failure on the counter side undoes
//! the entity write.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use super::{Result, ServiceError};
use crate::bus::{publish_detached, EventBus, EventListener};
use crate::domain::{CountStats, Taxonomy, TaxonomyKind, TaxonomyWithCount};
use crate::events::{PostEvent, PostEventType, TaxonomyEvent, TaxonomyEventType};
use crate::storage::{CountStatsStore, StorageError, TaxonomyStore};

pub struct TaxonomyService {
    kind: TaxonomyKind,
    store: Arc<dyn TaxonomyStore>,
    counters: Arc<dyn CountStatsStore>,
    bus: Arc<dyn EventBus>,
}

impl TaxonomyService {
    pub fn new(
        kind: TaxonomyKind,
        store: Arc<dyn TaxonomyStore>,
        counters: Arc<dyn CountStatsStore>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            kind,
            store,
            counters,
            bus,
        }
    }

    pub fn kind(&self) -> TaxonomyKind {
        self.kind
    }

    /// Persist a new entity and its post counter.
    pub async fn create(&self, mut taxonomy: Taxonomy) -> Result<Taxonomy> {
        taxonomy.kind = self.kind;
        if taxonomy.id.is_empty() {
            taxonomy.id = uuid::Uuid::new_v4().simple().to_string();
        }
        self.store.insert(&taxonomy).await?;

        let counter = CountStats::new(self.kind.count_type(), taxonomy.id.clone());
        if let Err(e) = self.counters.create(&counter).await {
            error!(
                kind = self.kind.as_str(),
                id = %taxonomy.id,
                error = %e,
                "Counter creation failed, removing entity"
            );
            if let Err(undo) = self.store.delete(self.kind, &taxonomy.id).await {
                error!(
                    kind = self.kind.as_str(),
                    id = %taxonomy.id,
                    error = %undo,
                    "Entity removal failed"
                );
            }
            return Err(e.into());
        }
        info!(kind = self.kind.as_str(), id = %taxonomy.id, name = %taxonomy.name, "Created");

        self.publish(&taxonomy.id, TaxonomyEventType::Create);
        Ok(taxonomy)
    }

    /// Delete an entity and its post counter.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let taxonomy = self.find_by_id(id).await?;
        if !self.store.delete(self.kind, id).await? {
            return Err(self.not_found(id));
        }

        if let Err(e) = self
            .counters
            .delete_by_reference_id(id, self.kind.count_type())
            .await
        {
            error!(
                kind = self.kind.as_str(),
                id,
                error = %e,
                "Counter removal failed, restoring entity"
            );
            if let Err(undo) = self.store.insert(&taxonomy).await {
                error!(kind = self.kind.as_str(), id, error = %undo, "Entity restore failed");
            }
            return Err(e.into());
        }
        info!(kind = self.kind.as_str(), id, "Deleted");

        self.publish(id, TaxonomyEventType::Delete);
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Taxonomy> {
        self.store
            .find_by_id(self.kind, id)
            .await?
            .ok_or_else(|| self.not_found(id))
    }

    /// Every entity of this kind with its post count. Entities whose
    /// counter row is missing report zero.
    pub async fn find_all_with_counts(&self) -> Result<Vec<TaxonomyWithCount>> {
        let taxonomies = self.store.find_all(self.kind).await?;
        let ids: Vec<String> = taxonomies.iter().map(|t| t.id.clone()).collect();
        let counts: HashMap<String, i64> = self
            .counters
            .get_by_reference_ids_and_type(&ids, self.kind.count_type())
            .await?
            .into_iter()
            .map(|row| (row.reference_id, row.count))
            .collect();

        Ok(taxonomies
            .into_iter()
            .map(|taxonomy| {
                let post_count = counts.get(&taxonomy.id).copied().unwrap_or(0);
                TaxonomyWithCount {
                    taxonomy,
                    post_count,
                }
            })
            .collect())
    }

    fn publish(&self, id: &str, event_type: TaxonomyEventType) {
        let event = TaxonomyEvent {
            id: id.to_string(),
            event_type,
        };
        publish_detached(&self.bus, self.kind.topic(), &event);
    }

    fn not_found(&self, id: &str) -> ServiceError {
        ServiceError::TaxonomyNotFound {
            kind: self.kind.as_str(),
            id: id.to_string(),
        }
    }
}

/// Keeps per-category or per-tag post counts in step with post membership.
pub struct TaxonomyPostListener {
    kind: TaxonomyKind,
    counters: Arc<dyn CountStatsStore>,
}

impl TaxonomyPostListener {
    pub fn new(kind: TaxonomyKind, counters: Arc<dyn CountStatsStore>) -> Self {
        Self { kind, counters }
    }
}

#[async_trait]
impl EventListener for TaxonomyPostListener {
    type Event = PostEvent;
    type Error = StorageError;

    fn name(&self) -> &'static str {
        match self.kind {
            TaxonomyKind::Category => "category-post-count",
            TaxonomyKind::Tag => "tag-post-count",
        }
    }

    async fn on_event(&self, event: PostEvent) -> std::result::Result<(), StorageError> {
        let (added, removed) = match self.kind {
            TaxonomyKind::Category => (&event.added_category_id, &event.deleted_category_id),
            TaxonomyKind::Tag => (&event.added_tag_id, &event.deleted_tag_id),
        };
        let stats_type = self.kind.count_type();

        if event.event_type != PostEventType::Delete && !added.is_empty() {
            self.counters
                .increase_by_reference_ids(added, stats_type, 1)
                .await?;
        }
        if event.event_type != PostEventType::Create && !removed.is_empty() {
            self.counters
                .decrease_by_reference_ids(removed, stats_type, 1)
                .await?;
        }
        debug!(
            kind = self.kind.as_str(),
            post_id = %event.post_id,
            added = added.len(),
            removed = removed.len(),
            "Post counts adjusted"
        );
        Ok(())
    }
}
