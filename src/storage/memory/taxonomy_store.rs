use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::injected;
use crate::domain::{Taxonomy, TaxonomyKind};
use crate::storage::{Result, StorageError, TaxonomyStore};

/// Categories and tags, keyed by `(kind, id)`.
#[derive(Default)]
pub struct MemoryTaxonomyStore {
    entries: RwLock<HashMap<(TaxonomyKind, String), Taxonomy>>,
    fail_on_delete: RwLock<bool>,
}

impl MemoryTaxonomyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_delete(&self, fail: bool) {
        *self.fail_on_delete.write().await = fail;
    }
}

#[async_trait]
impl TaxonomyStore for MemoryTaxonomyStore {
    async fn insert(&self, taxonomy: &Taxonomy) -> Result<()> {
        let mut entries = self.entries.write().await;
        let clash = entries.values().find(|t| {
            t.kind == taxonomy.kind && (t.id == taxonomy.id || t.name == taxonomy.name)
        });
        if let Some(existing) = clash {
            return Err(StorageError::Duplicate {
                entity: taxonomy.kind.as_str(),
                key: if existing.id == taxonomy.id {
                    taxonomy.id.clone()
                } else {
                    taxonomy.name.clone()
                },
            });
        }
        entries.insert((taxonomy.kind, taxonomy.id.clone()), taxonomy.clone());
        Ok(())
    }

    async fn find_by_id(&self, kind: TaxonomyKind, id: &str) -> Result<Option<Taxonomy>> {
        Ok(self
            .entries
            .read()
            .await
            .get(&(kind, id.to_string()))
            .cloned())
    }

    async fn find_all(&self, kind: TaxonomyKind) -> Result<Vec<Taxonomy>> {
        let entries = self.entries.read().await;
        let mut found: Vec<Taxonomy> = entries
            .values()
            .filter(|t| t.kind == kind)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn delete(&self, kind: TaxonomyKind, id: &str) -> Result<bool> {
        if *self.fail_on_delete.read().await {
            return Err(injected("delete taxonomy"));
        }
        Ok(self
            .entries
            .write()
            .await
            .remove(&(kind, id.to_string()))
            .is_some())
    }
}
