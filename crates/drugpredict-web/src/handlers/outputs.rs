//! Fallback for `/outputs` requests that match no generated file.

use axum::http::Uri;
use tracing::info;

use crate::error::ApiError;

pub async fn output_not_found(uri: Uri) -> ApiError {
    info!("Requested output file does not exist: {}", uri.path());
    ApiError::FileNotFound
}
