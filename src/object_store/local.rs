use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures_util::StreamExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::{
    sanitize_file_name, validate_object_name, ByteStream, ObjectReader, ObjectStore,
    ObjectStoreError, StoredObject,
};

/// Flat content directory on the local filesystem.
/// Objects are named `<unix-millis>-<sanitized original name>`.
pub struct LocalStore {
    base_path: PathBuf,
    max_object_size: u64,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P, max_object_size: u64) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            max_object_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn object_path(&self, name: &str) -> Result<PathBuf, ObjectStoreError> {
        validate_object_name(name)?;
        Ok(self.base_path.join(name))
    }

    /// Create a new, empty file whose name no other object uses.
    async fn create_unique(
        &self,
        sanitized: &str,
    ) -> Result<(String, PathBuf, File), ObjectStoreError> {
        let millis = Utc::now().timestamp_millis();
        let mut attempt: u32 = 0;
        loop {
            let name = if attempt == 0 {
                format!("{millis}-{sanitized}")
            } else {
                format!("{millis}-{attempt}-{sanitized}")
            };
            let path = self.base_path.join(&name);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((name, path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Removes a file on drop unless it was kept.
/// Covers early returns and futures dropped mid-write.
struct PartialFile {
    path: PathBuf,
    keep: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed partial upload"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove partial upload"
            ),
        }
    }
}

fn not_found_or_io(name: &str, e: std::io::Error) -> ObjectStoreError {
    if e.kind() == ErrorKind::NotFound {
        ObjectStoreError::NotFound(name.to_string())
    } else {
        ObjectStoreError::Io(e)
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        original_name: &str,
        mut body: ByteStream<'_>,
    ) -> Result<StoredObject, ObjectStoreError> {
        let sanitized = sanitize_file_name(original_name)?;
        let (name, path, file) = self.create_unique(&sanitized).await?;
        let partial = PartialFile::new(path);
        let mut file = file;

        let mut size: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            size += chunk.len() as u64;
            if size > self.max_object_size {
                return Err(ObjectStoreError::PayloadTooLarge {
                    limit: self.max_object_size,
                });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);
        partial.keep();

        Ok(StoredObject { name, size })
    }

    async fn open(&self, name: &str) -> Result<ObjectReader, ObjectStoreError> {
        let path = self.object_path(name)?;
        let file = File::open(&path)
            .await
            .map_err(|e| not_found_or_io(name, e))?;
        let size = file.metadata().await?.len();
        Ok(ObjectReader {
            reader: Box::new(file),
            size,
        })
    }

    async fn get(&self, name: &str) -> Result<Bytes, ObjectStoreError> {
        let path = self.object_path(name)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| not_found_or_io(name, e))?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, name: &str) -> Result<(), ObjectStoreError> {
        let path = self.object_path(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(name, e))
    }

    async fn exists(&self, name: &str) -> Result<bool, ObjectStoreError> {
        let path = self.object_path(name)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    fn remove_abandoned(&self, name: &str) -> Result<(), ObjectStoreError> {
        let path = self.object_path(name)?;
        std::fs::remove_file(&path).map_err(|e| not_found_or_io(name, e))
    }
}
