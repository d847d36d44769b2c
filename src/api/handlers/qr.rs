use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, ApiResponse};
use crate::discovery;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrResponse {
    pub qr_code: String,
    pub url: String,
}

/// QR code for the server's LAN URL, for opening the page on a phone.
pub async fn qr_code(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<QrResponse>>, ApiError> {
    let host = match &state.config.server.public_host {
        Some(host) => host.clone(),
        None => discovery::resolve_lan_address().await,
    };
    let url = discovery::access_url(&host, state.port);

    let qr_code = discovery::qr_data_url(&url)
        .map_err(|e| ApiError::internal("QR code generation failed", e.to_string()))?;

    Ok(ApiResponse::success(QrResponse { qr_code, url }))
}
