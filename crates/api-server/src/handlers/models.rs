//! Signed URLs for protected 3D models.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Route prefix of redeemable model URLs.
pub const MODELS_ROUTE: &str = "models";

/// Signed URL request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelUrlRequest {
    /// Asset path in the models bucket, e.g. `workbench.glb`.
    #[serde(default, alias = "resourcePath")]
    pub model_name: Option<String>,
}

/// Signed URL response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelUrlResponse {
    pub url: String,
    /// Expiry, epoch milliseconds.
    pub expires_at: i64,
}

/// Redemption query parameters.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RedeemParams {
    /// Expiry, epoch milliseconds.
    pub expires: Option<String>,
    /// Hex HMAC of `<path>:<expires>`.
    pub signature: Option<String>,
}

/// Issue a time-limited URL for a model.
#[utoipa::path(
    post,
    path = "/api/model-url",
    tag = "models",
    request_body = ModelUrlRequest,
    responses(
        (status = 200, description = "Signed URL issued", body = ModelUrlResponse),
        (status = 400, description = "Missing or invalid model name", body = crate::error::ErrorResponse)
    )
)]
pub async fn issue_model_url(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    payload: Result<Json<ModelUrlRequest>, JsonRejection>,
) -> ApiResult<Json<ModelUrlResponse>> {
    let Json(req) = payload?;
    let model_name = req
        .model_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("modelName is required".to_string()))?;

    let token = state.url_signer.issue(&model_name, state.clock.now())?;
    let url = token.to_url(&state.public_base(&headers, &uri)?, MODELS_ROUTE)?;

    tracing::info!(model = %model_name, expires_at = token.expires_at_ms, "Issued model URL");
    Ok(Json(ModelUrlResponse {
        url: url.into(),
        expires_at: token.expires_at_ms,
    }))
}

/// Serve a model through a signed URL.
#[utoipa::path(
    get,
    path = "/models/{path}",
    tag = "models",
    params(
        ("path" = String, Path, description = "Asset path the URL was issued for"),
        RedeemParams
    ),
    responses(
        (status = 200, description = "Model bytes"),
        (status = 401, description = "Missing, expired or invalid signature", body = crate::error::ErrorResponse),
        (status = 404, description = "No such model", body = crate::error::ErrorResponse)
    )
)]
pub async fn redeem_model_url(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(params): Query<RedeemParams>,
) -> ApiResult<Response> {
    let now = state.clock.now();
    let expires_at_ms = state
        .url_signer
        .verify(&path, params.expires.as_deref(), params.signature.as_deref(), now)
        .map_err(|e| {
            tracing::warn!(path = %path, error = %e, "Model URL rejected");
            ApiError::from(e)
        })?;

    let object = state
        .assets
        .get(&path)
        .await?
        .ok_or_else(|| ApiError::NotFound("Model not found".to_string()))?;

    let content_type = object
        .metadata
        .content_type
        .clone()
        .unwrap_or_else(|| content_type_for(&path).to_string());
    let content_type =
        HeaderValue::from_str(&content_type).map_err(|e| ApiError::Internal(e.to_string()))?;

    let remaining_secs = ((expires_at_ms - now.timestamp_millis()) / 1000).max(0);
    let cache_control = HeaderValue::from_str(&format!("private, max-age={}", remaining_secs))
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, content_type), (CACHE_CONTROL, cache_control)],
        object.body,
    )
        .into_response())
}

/// Content type by file extension.
fn content_type_for(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "glb" => "model/gltf-binary",
        "gltf" => "model/gltf+json",
        "obj" => "model/obj",
        "stl" => "model/stl",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}
