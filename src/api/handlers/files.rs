use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use axum::Json;
use futures_util::{StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use super::service_error;
use crate::api::response::{ApiError, ApiResponse, Empty};
use crate::service::UploadItem;
use crate::storage::FileRecord;
use crate::AppState;

/// Multipart field carrying uploaded files.
const FILES_FIELD: &str = "files";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub files: Vec<FileRecord>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub files: Vec<FileRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<UploadErrorResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadErrorResponse {
    pub original_name: String,
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let mut batch = state.service.begin_upload();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                // A file cut off at the size ceiling is drained by the parser;
                // the body limit can trip during that drain.
                let too_large = batch
                    .oversized()
                    .map(|f| f.error.to_string())
                    .or_else(|| {
                        (e.status() == StatusCode::PAYLOAD_TOO_LARGE).then(|| {
                            format!(
                                "Upload exceeds maximum request size of {} bytes",
                                state.config.upload_body_limit()
                            )
                        })
                    });
                batch.discard().await;
                return Err(match too_large {
                    Some(message) => ApiError::payload_too_large(message),
                    None => ApiError::bad_request(format!("Invalid multipart data: {e}")),
                });
            }
        };

        if field.name() != Some(FILES_FIELD) {
            // Ignore unknown fields
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|s| s.to_string());
        let declared_size = field
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());

        let item = UploadItem {
            original_name,
            content_type,
            declared_size,
            body: field.map_err(std::io::Error::other).boxed(),
        };
        batch
            .push(item)
            .await
            .map_err(service_error("Upload failed"))?;
    }

    let outcome = batch.commit().await.map_err(service_error("Upload failed"))?;

    let message = if outcome.failures.is_empty() {
        "Files uploaded successfully"
    } else {
        "Some files could not be uploaded"
    };
    let errors = outcome
        .failures
        .into_iter()
        .map(|f| UploadErrorResponse {
            original_name: f.original_name,
            message: f.error.to_string(),
        })
        .collect();

    Ok(ApiResponse::success_with_message(
        message,
        UploadResponse {
            files: outcome.files,
            errors,
        },
    ))
}

pub async fn list_files(State(state): State<Arc<AppState>>) -> Json<ApiResponse<FilesResponse>> {
    ApiResponse::success(FilesResponse {
        files: state.service.handle_list(),
    })
}

/// Stream a file back under its original name.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(stored_name): Path<String>,
) -> Result<Response, ApiError> {
    let (record, object) = state
        .service
        .open(&stored_name)
        .await
        .map_err(service_error("Download failed"))?;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(object.reader)));
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&record.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(object.size));
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&record.original_name)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(stored_name): Path<String>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .service
        .handle_delete(&stored_name)
        .await
        .map_err(service_error("Delete failed"))?;

    Ok(ApiResponse::success_with_message(
        "File deleted successfully",
        Empty {},
    ))
}

// ============================================================================
// Helpers
// ============================================================================

/// `attachment` disposition with an ASCII fallback name and the exact name
/// percent-encoded per RFC 5987.
fn content_disposition(original_name: &str) -> String {
    let fallback: String = original_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    let mut encoded = String::with_capacity(original_name.len());
    for byte in original_name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }

    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

#[cfg(test)]
mod tests {
    use super::content_disposition;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("a.txt"),
            "attachment; filename=\"a.txt\"; filename*=UTF-8''a.txt"
        );
    }

    #[test]
    fn test_content_disposition_escapes() {
        assert_eq!(
            content_disposition("résumé \"v2\".pdf"),
            "attachment; filename=\"r_sum_ _v2_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9%20%22v2%22.pdf"
        );
    }
}
