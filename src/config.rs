use std::net::SocketAddr;

use thiserror::Error;

/// Upper bound for `EVENT_BUFFER_SIZE`; every subscriber may hold this many events.
pub const MAX_EVENT_BUFFER_SIZE: usize = 65_536;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    /// Maximum size of a single uploaded file in bytes
    pub max_upload_size: u64,
    /// Maximum number of files accepted by one upload request
    pub max_files_per_upload: usize,
    /// Events buffered per live subscriber before it starts skipping
    pub event_buffer_size: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Host advertised in the access URL. Discovered from the LAN when unset.
    pub public_host: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Content directory holding uploaded files
    pub upload_dir: String,
    /// Directory with the static front-end
    pub public_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            public_host: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: "./uploads".to_string(),
            public_dir: "./public".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            max_upload_size: 100 * 1024 * 1024,
            max_files_per_upload: 10,
            event_buffer_size: 64,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| format!("0.0.0.0:{port}"));

        let public_host = std::env::var("PUBLIC_HOST")
            .ok()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());

        let upload_dir =
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| defaults.storage.upload_dir.clone());
        let public_dir =
            std::env::var("PUBLIC_DIR").unwrap_or_else(|_| defaults.storage.public_dir.clone());

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_upload_size);

        let max_files_per_upload = std::env::var("MAX_FILES_PER_UPLOAD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_files_per_upload);

        let event_buffer_size = std::env::var("EVENT_BUFFER_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.event_buffer_size);

        let config = Config {
            server: ServerConfig {
                bind_address,
                public_host,
            },
            storage: StorageConfig {
                upload_dir,
                public_dir,
            },
            max_upload_size,
            max_files_per_upload,
            event_buffer_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.max_files_per_upload == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_FILES_PER_UPLOAD must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "EVENT_BUFFER_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "EVENT_BUFFER_SIZE must be at most {MAX_EVENT_BUFFER_SIZE}"
            )));
        }

        Ok(())
    }

    /// Parsed listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.bind_address.parse().map_err(|e| {
            ConfigError::ValidationError(format!(
                "BIND_ADDRESS '{}' is not a valid socket address: {e}",
                self.server.bind_address
            ))
        })
    }

    /// Largest request body the upload route accepts: every permitted file at
    /// full size, plus room for multipart framing.
    pub fn upload_body_limit(&self) -> usize {
        let per_file = usize::try_from(self.max_upload_size).unwrap_or(usize::MAX);
        per_file
            .saturating_mul(self.max_files_per_upload)
            .saturating_add(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr().unwrap().port(), 3000);
    }

    #[test]
    fn test_rejects_bad_bind_address() {
        let mut config = Config::default();
        config.server.bind_address = "not-an-address".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_zero_file_ceiling() {
        let config = Config {
            max_files_per_upload: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_event_buffer_size_bounds() {
        let at_max = Config {
            event_buffer_size: MAX_EVENT_BUFFER_SIZE,
            ..Config::default()
        };
        assert!(at_max.validate().is_ok());

        for event_buffer_size in [0, MAX_EVENT_BUFFER_SIZE + 1, usize::MAX] {
            let config = Config {
                event_buffer_size,
                ..Config::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::ValidationError(_))
            ));
        }
    }

    #[test]
    fn test_upload_body_limit_saturates() {
        let config = Config {
            max_upload_size: u64::MAX,
            ..Config::default()
        };
        assert_eq!(config.upload_body_limit(), usize::MAX);
    }
}
