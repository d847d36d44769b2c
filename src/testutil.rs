//! Shared test helpers for file-share unit tests.

use std::sync::Arc;

use crate::config::{Config, ServerConfig, StorageConfig};
use crate::events::Broadcaster;
use crate::object_store::LocalStore;
use crate::service::{FileService, UploadLimits};
use crate::AppState;

/// Create a test AppState backed by a temporary content directory.
/// Limits are small: 1 KiB per file, 3 files per upload.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let upload_dir = temp_dir.path().join("uploads");
    let public_dir = temp_dir.path().join("public");

    let config = Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            public_host: Some("192.168.1.20".to_string()),
        },
        storage: StorageConfig {
            upload_dir: upload_dir.to_string_lossy().to_string(),
            public_dir: public_dir.to_string_lossy().to_string(),
        },
        max_upload_size: 1024,
        max_files_per_upload: 3,
        event_buffer_size: 16,
    };

    std::fs::create_dir_all(&public_dir).expect("Failed to create public dir");
    std::fs::write(public_dir.join("index.html"), "<h1>file-share</h1>")
        .expect("Failed to write index.html");

    let object_store = LocalStore::new(&upload_dir, config.max_upload_size)
        .expect("Failed to create test object store");
    let service = FileService::new(
        Arc::new(object_store),
        Broadcaster::new(config.event_buffer_size),
        UploadLimits::from(&config),
    );

    Arc::new(AppState {
        config,
        port: 3000,
        service,
    })
}
