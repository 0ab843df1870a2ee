use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::FileReference;
use crate::storage::{FileIndexStore, Result};

#[derive(Default)]
pub struct MemoryFileIndexStore {
    references: RwLock<HashSet<FileReference>>,
}

impl MemoryFileIndexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileIndexStore for MemoryFileIndexStore {
    async fn index(&self, reference: &FileReference) -> Result<()> {
        self.references.write().await.insert(reference.clone());
        Ok(())
    }

    async fn unindex(&self, reference: &FileReference) -> Result<u64> {
        let removed = self.references.write().await.remove(reference);
        Ok(u64::from(removed))
    }

    async fn find_by_file_id(&self, file_id: &str) -> Result<Vec<FileReference>> {
        Ok(self
            .references
            .read()
            .await
            .iter()
            .filter(|r| r.file_id == file_id)
            .cloned()
            .collect())
    }
}
