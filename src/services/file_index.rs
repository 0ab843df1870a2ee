//! Which entities reference which uploaded files.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::Result;
use crate::bus::EventListener;
use crate::domain::{FileReference, FILE_ENTITY_POST};
use crate::events::{PostEvent, PostEventType};
use crate::storage::{FileIndexStore, StorageError};

#[derive(Clone)]
pub struct FileIndexService {
    store: Arc<dyn FileIndexStore>,
}

impl FileIndexService {
    pub fn new(store: Arc<dyn FileIndexStore>) -> Self {
        Self { store }
    }

    pub async fn references(&self, file_id: &str) -> Result<Vec<FileReference>> {
        Ok(self.store.find_by_file_id(file_id).await?)
    }

    /// A file is in use while anything references it.
    pub async fn is_referenced(&self, file_id: &str) -> Result<bool> {
        Ok(!self.references(file_id).await?.is_empty())
    }
}

fn post_reference(file_id: &str, post_id: &str) -> FileReference {
    FileReference {
        file_id: file_id.to_string(),
        entity_id: post_id.to_string(),
        entity_type: FILE_ENTITY_POST.to_string(),
    }
}

/// Tracks post cover images.
pub struct FileIndexListener {
    store: Arc<dyn FileIndexStore>,
}

impl FileIndexListener {
    pub fn new(store: Arc<dyn FileIndexStore>) -> Self {
        Self { store }
    }

    async fn index(
        &self,
        file_id: Option<&str>,
        post_id: &str,
    ) -> std::result::Result<(), StorageError> {
        if let Some(file_id) = file_id.filter(|f| !f.is_empty()) {
            self.store.index(&post_reference(file_id, post_id)).await?;
            debug!(file_id, post_id, "File indexed");
        }
        Ok(())
    }

    async fn unindex(
        &self,
        file_id: Option<&str>,
        post_id: &str,
    ) -> std::result::Result<(), StorageError> {
        if let Some(file_id) = file_id.filter(|f| !f.is_empty()) {
            let removed = self.store.unindex(&post_reference(file_id, post_id)).await?;
            debug!(file_id, post_id, removed, "File unindexed");
        }
        Ok(())
    }
}

#[async_trait]
impl EventListener for FileIndexListener {
    type Event = PostEvent;
    type Error = StorageError;

    fn name(&self) -> &'static str {
        "file-index"
    }

    async fn on_event(&self, event: PostEvent) -> std::result::Result<(), StorageError> {
        let old = event.old_file_id.as_deref();
        let new = event.new_file_id.as_deref();
        match event.event_type {
            PostEventType::Create => self.index(new, &event.post_id).await,
            PostEventType::Update if old != new => {
                self.unindex(old, &event.post_id).await?;
                self.index(new, &event.post_id).await
            }
            PostEventType::Update => Ok(()),
            PostEventType::Delete => self.unindex(old, &event.post_id).await,
        }
    }
}
