//! Upload, delete and list orchestration over the object store, registry and
//! broadcaster.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::events::{Broadcaster, FileEvent, Subscription};
use crate::object_store::{ByteStream, ObjectReader, ObjectStore, ObjectStoreError};
use crate::storage::{FileRecord, Registry};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Failed to store file: {0}")]
    StorageWrite(String),
    #[error("File exceeds maximum upload size of {limit} bytes")]
    PayloadTooLarge { limit: u64 },
    #[error("Too many files: at most {limit} per upload")]
    TooManyFiles { limit: usize },
    #[error("Rejected unsafe file name: {0:?}")]
    PathTraversalRejected(String),
}

impl From<ObjectStoreError> for ServiceError {
    fn from(e: ObjectStoreError) -> Self {
        match e {
            ObjectStoreError::NotFound(name) => ServiceError::NotFound(name),
            ObjectStoreError::PayloadTooLarge { limit } => ServiceError::PayloadTooLarge { limit },
            ObjectStoreError::PathTraversal(name) => ServiceError::PathTraversalRejected(name),
            ObjectStoreError::Io(e) => ServiceError::StorageWrite(e.to_string()),
        }
    }
}

/// Admission limits applied to every upload request.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_upload_size: u64,
    pub max_files_per_upload: usize,
}

impl From<&Config> for UploadLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_upload_size: config.max_upload_size,
            max_files_per_upload: config.max_files_per_upload,
        }
    }
}

/// One file of an upload request.
pub struct UploadItem<'a> {
    pub original_name: String,
    pub content_type: Option<String>,
    /// Size announced by the transport, if any. Checked before any byte is written.
    pub declared_size: Option<u64>,
    pub body: ByteStream<'a>,
}

#[derive(Debug)]
pub struct UploadFailure {
    pub original_name: String,
    pub error: ServiceError,
}

/// Records stored by an upload, plus the items that could not be stored.
#[derive(Debug, Default)]
pub struct UploadOutcome {
    pub files: Vec<FileRecord>,
    pub failures: Vec<UploadFailure>,
}

pub struct FileService {
    object_store: Arc<dyn ObjectStore>,
    registry: Registry,
    broadcaster: Broadcaster,
    limits: UploadLimits,
    /// Serializes registry mutations with their storage side effects and events.
    mutation_lock: Mutex<()>,
}

impl FileService {
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        broadcaster: Broadcaster,
        limits: UploadLimits,
    ) -> Self {
        Self {
            object_store,
            registry: Registry::new(),
            broadcaster,
            limits,
            mutation_lock: Mutex::new(()),
        }
    }

    /// Store a complete batch of files.
    pub async fn handle_upload(
        &self,
        items: Vec<UploadItem<'_>>,
    ) -> Result<UploadOutcome, ServiceError> {
        if items.len() > self.limits.max_files_per_upload {
            return Err(ServiceError::TooManyFiles {
                limit: self.limits.max_files_per_upload,
            });
        }

        let mut batch = self.begin_upload();
        for item in items {
            batch.push(item).await?;
        }
        batch.commit().await
    }

    /// Start a batch whose items arrive one at a time.
    pub fn begin_upload(&self) -> UploadBatch<'_> {
        UploadBatch {
            service: self,
            received: 0,
            records: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub async fn handle_delete(&self, stored_name: &str) -> Result<(), ServiceError> {
        let _guard = self.mutation_lock.lock().await;

        if self.registry.find_by_stored_name(stored_name).is_none() {
            return Err(ServiceError::NotFound(stored_name.to_string()));
        }

        match self.object_store.delete(stored_name).await {
            Ok(()) => {}
            Err(ObjectStoreError::NotFound(_)) => {
                tracing::warn!(stored_name, "Backing file already missing, dropping record");
            }
            Err(e) => return Err(e.into()),
        }

        self.registry.remove(stored_name);
        self.broadcaster
            .publish(FileEvent::FileRemoved(stored_name.to_string()));

        tracing::info!(stored_name, "Deleted file");
        Ok(())
    }

    pub fn handle_list(&self) -> Vec<FileRecord> {
        self.registry.list()
    }

    pub fn find(&self, stored_name: &str) -> Result<FileRecord, ServiceError> {
        self.registry
            .find_by_stored_name(stored_name)
            .ok_or_else(|| ServiceError::NotFound(stored_name.to_string()))
    }

    /// Record and readable content for a registered file.
    pub async fn open(
        &self,
        stored_name: &str,
    ) -> Result<(FileRecord, ObjectReader), ServiceError> {
        let record = self.find(stored_name)?;
        let reader = self.object_store.open(&record.stored_name).await?;
        Ok((record, reader))
    }

    pub fn subscribe(&self) -> Subscription {
        self.broadcaster.subscribe()
    }

    pub fn file_count(&self) -> usize {
        self.registry.len()
    }

    async fn store_item(&self, item: UploadItem<'_>) -> Result<FileRecord, UploadFailure> {
        let UploadItem {
            original_name,
            content_type,
            declared_size,
            body,
        } = item;

        if declared_size.is_some_and(|size| size > self.limits.max_upload_size) {
            return Err(UploadFailure {
                original_name,
                error: ServiceError::PayloadTooLarge {
                    limit: self.limits.max_upload_size,
                },
            });
        }

        let stored = match self.object_store.put(&original_name, body).await {
            Ok(stored) => stored,
            Err(e) => {
                return Err(UploadFailure {
                    original_name,
                    error: e.into(),
                })
            }
        };

        let content_type = content_type
            .filter(|ct| !ct.trim().is_empty())
            .or_else(|| {
                mime_guess::from_path(&original_name)
                    .first()
                    .map(|m| m.to_string())
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(FileRecord {
            id: uuid::Uuid::new_v4().to_string(),
            original_name,
            stored_name: stored.name,
            size: stored.size,
            content_type,
            uploaded_at: Utc::now(),
        })
    }
}

/// An upload in progress. Nothing is registered or published until `commit`.
pub struct UploadBatch<'s> {
    service: &'s FileService,
    received: usize,
    records: Vec<FileRecord>,
    failures: Vec<UploadFailure>,
}

impl UploadBatch<'_> {
    /// Store one item. Per-item failures are collected for the outcome;
    /// only crossing the file-count ceiling fails the batch, after discarding it.
    pub async fn push(&mut self, item: UploadItem<'_>) -> Result<(), ServiceError> {
        self.received += 1;
        let limit = self.service.limits.max_files_per_upload;
        if self.received > limit {
            self.discard().await;
            return Err(ServiceError::TooManyFiles { limit });
        }

        match self.service.store_item(item).await {
            Ok(record) => {
                tracing::debug!(
                    stored_name = %record.stored_name,
                    size = record.size,
                    "Stored upload"
                );
                self.records.push(record);
            }
            Err(failure) => {
                tracing::warn!(
                    original_name = %failure.original_name,
                    error = %failure.error,
                    "Failed to store upload"
                );
                self.failures.push(failure);
            }
        }
        Ok(())
    }

    /// First item rejected for exceeding the size ceiling, if any.
    pub fn oversized(&self) -> Option<&UploadFailure> {
        self.failures
            .iter()
            .find(|f| matches!(f.error, ServiceError::PayloadTooLarge { .. }))
    }

    /// Remove everything this batch stored so far (best-effort).
    pub async fn discard(&mut self) {
        for record in self.records.drain(..) {
            if let Err(e) = self.service.object_store.delete(&record.stored_name).await {
                tracing::warn!(
                    stored_name = %record.stored_name,
                    error = %e,
                    "Failed to clean up discarded upload"
                );
            }
        }
        self.failures.clear();
    }

    /// Register the stored files and notify subscribers.
    ///
    /// Fails with the first item error when nothing could be stored.
    pub async fn commit(mut self) -> Result<UploadOutcome, ServiceError> {
        let mut failures = std::mem::take(&mut self.failures);

        if self.records.is_empty() {
            if failures.is_empty() {
                return Ok(UploadOutcome::default());
            }
            return Err(failures.swap_remove(0).error);
        }

        let service = self.service;
        let records = {
            let _guard = service.mutation_lock.lock().await;
            // Taken only once the lock is held: a commit dropped while waiting
            // still leaves the files to `Drop`.
            let records = std::mem::take(&mut self.records);
            service.registry.append(records.clone());
            service
                .broadcaster
                .publish(FileEvent::FilesAdded(records.clone()));
            records
        };

        tracing::info!(
            files = records.len(),
            failed = failures.len(),
            "Upload committed"
        );

        Ok(UploadOutcome {
            files: records,
            failures,
        })
    }
}

/// An abandoned batch (client gone, request cancelled) removes the files it
/// stored, so no file outlives the request without a registry record.
impl Drop for UploadBatch<'_> {
    fn drop(&mut self) {
        for record in self.records.drain(..) {
            match self
                .service
                .object_store
                .remove_abandoned(&record.stored_name)
            {
                Ok(()) => tracing::debug!(
                    stored_name = %record.stored_name,
                    "Removed upload from abandoned batch"
                ),
                Err(e) => tracing::warn!(
                    stored_name = %record.stored_name,
                    error = %e,
                    "Failed to remove upload from abandoned batch"
                ),
            }
        }
    }
}
