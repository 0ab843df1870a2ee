use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::injected;
use crate::domain::{CountStats, CountStatsType};
use crate::storage::{CountStatsStore, Result, StorageError};

type CounterKey = (CountStatsType, String);

#[derive(Default)]
pub struct MemoryCountStatsStore {
    counters: RwLock<HashMap<CounterKey, i64>>,
    fail_on_create: RwLock<bool>,
    fail_on_delete: RwLock<bool>,
    fail_on_adjust: RwLock<bool>,
}

impl MemoryCountStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_create(&self, fail: bool) {
        *self.fail_on_create.write().await = fail;
    }

    pub async fn set_fail_on_delete(&self, fail: bool) {
        *self.fail_on_delete.write().await = fail;
    }

    pub async fn set_fail_on_adjust(&self, fail: bool) {
        *self.fail_on_adjust.write().await = fail;
    }

    /// Current value of a counter, if the row exists.
    pub async fn count(&self, stats_type: CountStatsType, reference_id: &str) -> Option<i64> {
        self.counters
            .read()
            .await
            .get(&(stats_type, reference_id.to_string()))
            .copied()
    }
}

#[async_trait]
impl CountStatsStore for MemoryCountStatsStore {
    async fn create(&self, stats: &CountStats) -> Result<()> {
        if *self.fail_on_create.read().await {
            return Err(injected("create counter"));
        }
        let key = (stats.stats_type, stats.reference_id.clone());
        let mut counters = self.counters.write().await;
        if counters.contains_key(&key) {
            return Err(StorageError::Duplicate {
                entity: "count stats",
                key: format!("{}/{}", stats.stats_type, stats.reference_id),
            });
        }
        counters.insert(key, stats.count);
        Ok(())
    }

    async fn adjust_by_reference_ids(
        &self,
        reference_ids: &[String],
        stats_type: CountStatsType,
        delta: i64,
    ) -> Result<u64> {
        if *self.fail_on_adjust.read().await {
            return Err(injected("adjust counters"));
        }
        let mut counters = self.counters.write().await;
        let mut touched = 0;
        for id in reference_ids {
            if let Some(count) = counters.get_mut(&(stats_type, id.clone())) {
                *count += delta;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn get_by_reference_ids_and_type(
        &self,
        reference_ids: &[String],
        stats_type: CountStatsType,
    ) -> Result<Vec<CountStats>> {
        let counters = self.counters.read().await;
        Ok(reference_ids
            .iter()
            .filter_map(|id| {
                counters
                    .get(&(stats_type, id.clone()))
                    .map(|&count| CountStats {
                        stats_type,
                        reference_id: id.clone(),
                        count,
                    })
            })
            .collect())
    }

    async fn get_by_types(&self, types: &[CountStatsType]) -> Result<Vec<CountStats>> {
        let counters = self.counters.read().await;
        Ok(counters
            .iter()
            .filter(|((t, _), _)| types.contains(t))
            .map(|((t, id), &count)| CountStats {
                stats_type: *t,
                reference_id: id.clone(),
                count,
            })
            .collect())
    }

    async fn delete_by_reference_id(
        &self,
        reference_id: &str,
        stats_type: CountStatsType,
    ) -> Result<u64> {
        if *self.fail_on_delete.read().await {
            return Err(injected("delete counter"));
        }
        let removed = self
            .counters
            .write()
            .await
            .remove(&(stats_type, reference_id.to_string()));
        Ok(removed.map_or(0, |_| 1))
    }
}
