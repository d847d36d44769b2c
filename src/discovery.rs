//! LAN address discovery and the QR code pointing other devices at this server.

use std::io::Cursor;
use std::net::{IpAddr, Ipv4Addr};

use base64::Engine;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use thiserror::Error;
use tokio::net::UdpSocket;

/// Fallback host when no LAN address can be found.
pub const LOCALHOST: &str = "localhost";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("QR code generation failed: {0}")]
    Generation(String),
}

/// Best guess at the IPv4 address other devices on the network can reach.
///
/// Asks the OS which local address it would route an outbound datagram from.
/// Connecting a UDP socket sends nothing, so this works without network access
/// to the target. Falls back to `"localhost"`.
pub async fn resolve_lan_address() -> String {
    match routed_ipv4().await {
        Some(ip) => ip.to_string(),
        None => {
            tracing::debug!("No LAN address found, falling back to localhost");
            LOCALHOST.to_string()
        }
    }
}

async fn routed_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.ok()?;
    // TEST-NET-1, never actually contacted
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 80)).await.ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

pub fn access_url(host: &str, port: u16) -> String {
    format!("http://{host}:{port}")
}

/// Render `url` as a PNG QR code wrapped in a `data:` URL.
pub fn qr_data_url(url: &str) -> Result<String, DiscoveryError> {
    let code = QrCode::new(url.as_bytes()).map_err(|e| DiscoveryError::Generation(e.to_string()))?;
    let image = code.render::<Luma<u8>>().min_dimensions(200, 200).build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| DiscoveryError::Generation(e.to_string()))?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
    Ok(format!("data:image/png;base64,{encoded}"))
}
