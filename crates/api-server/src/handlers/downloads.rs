//! Rendered plan downloads.

use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use regex::Regex;
use std::sync::{Arc, LazyLock};

use fulfillment_core::types::{ORDERS_PREFIX, PDF_CONTENT_TYPE};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Word characters and dashes with a `.pdf` suffix; no separators, no dots.
static FILENAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+\.pdf$").expect("valid filename pattern"));

const DOWNLOAD_CACHE_CONTROL: &str = "private, max-age=3600";

pub fn is_valid_filename(filename: &str) -> bool {
    FILENAME_PATTERN.is_match(filename)
}

/// Download a rendered plan by file name.
#[utoipa::path(
    get,
    path = "/download/{filename}",
    tag = "fulfillment",
    params(
        ("filename" = String, Path, description = "File name from the download URL")
    ),
    responses(
        (status = 200, description = "Personalized PDF", content_type = "application/pdf"),
        (status = 400, description = "Invalid file name", body = crate::error::ErrorResponse),
        (status = 404, description = "No such file", body = crate::error::ErrorResponse)
    )
)]
pub async fn download_plan(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    if !is_valid_filename(&filename) {
        tracing::warn!(filename = %filename, "Rejected download file name");
        return Err(ApiError::BadRequest("Invalid filename".to_string()));
    }

    let key = format!("{}{}", ORDERS_PREFIX, filename);
    let object = state
        .documents
        .get(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound("PDF not found".to_string()))?;

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::debug!(key = %key, size = object.body.len(), "Serving plan download");
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static(PDF_CONTENT_TYPE)),
            (CONTENT_DISPOSITION, disposition),
            (CACHE_CONTROL, HeaderValue::from_static(DOWNLOAD_CACHE_CONTROL)),
        ],
        object.body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_pattern() {
        for name in ["order-1001_1772366400123.pdf", "a.pdf", "A_b-9.pdf"] {
            assert!(is_valid_filename(name), "{name}");
        }
        for name in [
            "../../secret.txt",
            "../order-1.pdf",
            "order.1.pdf",
            "order 1.pdf",
            "order-1.PDF",
            ".pdf",
            "é.pdf",
            "order-1.pdf\n",
        ] {
            assert!(!is_valid_filename(name), "{name:?}");
        }
    }
}
