mod files;
mod health;
mod live;
mod qr;

use crate::api::response::ApiError;
use crate::service::ServiceError;

pub use files::{delete_file, download_file, list_files, upload_files};
pub use health::health;
pub use live::live_updates;
pub use qr::qr_code;

/// Map a ServiceError to an ApiError, using `action` as the 5xx message.
fn service_error(action: &'static str) -> impl Fn(ServiceError) -> ApiError {
    move |e| match e {
        ServiceError::NotFound(_) => ApiError::not_found("File not found"),
        ServiceError::PayloadTooLarge { .. } => ApiError::payload_too_large(e.to_string()),
        _ => ApiError::internal(action, e.to_string()),
    }
}
