//! file-share - Share files between devices on the same local network
//!
//! This crate provides:
//! - Multipart uploads into a flat content directory with collision-free names
//! - An in-memory registry of shared files (rebuilt empty on every start)
//! - Live change notifications to connected viewers over WebSocket
//! - A QR code pointing at the server's LAN address

pub mod api;
pub mod config;
pub mod discovery;
pub mod events;
pub mod object_store;
pub mod service;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use config::Config;
use service::FileService;

/// Shared application state
pub struct AppState {
    pub config: Config,
    /// Port advertised in the access URL
    pub port: u16,
    pub service: FileService,
}
