mod local;

pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Longest sanitized name kept from a client filename, leaving room for the
/// timestamp prefix within common filesystem name limits.
const MAX_NAME_BYTES: usize = 200;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Object exceeds maximum size of {limit} bytes")]
    PayloadTooLarge { limit: u64 },
    #[error("Rejected unsafe file name: {0:?}")]
    PathTraversal(String),
}

/// Incoming object content, delivered chunk by chunk.
pub type ByteStream<'a> = BoxStream<'a, Result<Bytes, std::io::Error>>;

/// Result of a successful `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Collision-free name the object is addressed by from now on.
    pub name: String,
    pub size: u64,
}

/// Readable handle to stored content.
pub struct ObjectReader {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub size: u64,
}

/// Abstraction over the content directory.
/// Names handed out by `put` are the only keys accepted by the other methods.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist `body` under a fresh name derived from `original_name`.
    /// Never overwrites an existing object; a failed write leaves nothing behind.
    async fn put(
        &self,
        original_name: &str,
        body: ByteStream<'_>,
    ) -> Result<StoredObject, ObjectStoreError>;
    async fn open(&self, name: &str) -> Result<ObjectReader, ObjectStoreError>;
    async fn get(&self, name: &str) -> Result<Bytes, ObjectStoreError>;
    /// Fails with `NotFound` when the object is absent.
    async fn delete(&self, name: &str) -> Result<(), ObjectStoreError>;
    async fn exists(&self, name: &str) -> Result<bool, ObjectStoreError>;
    /// Blocking removal for cleanup paths that cannot await, such as `Drop`.
    fn remove_abandoned(&self, name: &str) -> Result<(), ObjectStoreError>;
}

/// Reduce a client-supplied filename to a single safe path component.
///
/// Directory parts (either separator style) and control characters are
/// dropped. Names that end up empty, `.` or `..` are rejected.
pub fn sanitize_file_name(original: &str) -> Result<String, ObjectStoreError> {
    let last = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(ObjectStoreError::PathTraversal(original.to_string()));
    }

    Ok(truncate_to_boundary(cleaned, MAX_NAME_BYTES).to_string())
}

/// Check that `name` addresses an entry directly inside the content directory.
pub fn validate_object_name(name: &str) -> Result<(), ObjectStoreError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control)
    {
        return Err(ObjectStoreError::PathTraversal(name.to_string()));
    }
    Ok(())
}

fn truncate_to_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\a.txt").unwrap(), "a.txt");
        assert_eq!(sanitize_file_name("report.pdf").unwrap(), "report.pdf");
    }

    #[test]
    fn test_sanitize_rejects_empty_and_dots() {
        for name in ["", "..", "../", "dir/..", "  ", "\u{0}"] {
            assert!(
                matches!(
                    sanitize_file_name(name),
                    Err(ObjectStoreError::PathTraversal(_))
                ),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let long = "é".repeat(150);
        let sanitized = sanitize_file_name(&long).unwrap();
        assert!(sanitized.len() <= MAX_NAME_BYTES);
        assert!(sanitized.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_validate_object_name() {
        assert!(validate_object_name("1700000000000-a.txt").is_ok());
        assert!(validate_object_name("../secret").is_err());
        assert!(validate_object_name("..").is_err());
        assert!(validate_object_name("a\\b").is_err());
    }
}
