//! Storefront purchase webhook.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use fulfillment_core::{Delivery, FulfillmentReceipt, SIGNATURE_HEADER};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// A fulfilled order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FulfilledResponse {
    pub success: bool,
    /// Link to the personalized PDF.
    pub download_url: String,
    /// Storage key of the rendered copy.
    pub filename: String,
    /// Whether the confirmation e-mail went out.
    pub email_sent: bool,
}

impl From<FulfillmentReceipt> for FulfilledResponse {
    fn from(receipt: FulfillmentReceipt) -> Self {
        Self {
            success: receipt.success,
            download_url: receipt.download_url,
            filename: receipt.filename,
            email_sent: receipt.email_sent,
        }
    }
}

/// An acknowledged event that needs no fulfillment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IgnoredResponse {
    pub success: bool,
    pub ignored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
}

/// Webhook response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum WebhookResponse {
    Fulfilled(FulfilledResponse),
    Ignored(IgnoredResponse),
}

/// Receive a purchase notification and fulfill it.
///
/// The body is read raw so the HMAC is checked over the exact bytes sent.
/// The public origin is only resolved once an order passes verification.
#[utoipa::path(
    post,
    path = "/webhook",
    tag = "fulfillment",
    request_body(content = String, description = "Order event JSON", content_type = "application/json"),
    params(
        ("X-Signature" = Option<String>, Header, description = "Hex HMAC-SHA256 of the raw body")
    ),
    responses(
        (status = 200, description = "Order fulfilled or event ignored", body = WebhookResponse),
        (status = 400, description = "Malformed payload or missing fields", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid signature", body = crate::error::ErrorResponse),
        (status = 500, description = "Template or storage failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookResponse>> {
    let signature = match headers.get(SIGNATURE_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| ApiError::Unauthorized("Invalid signature header".to_string()))?,
        ),
        None => None,
    };

    let event = match state.pipeline.accept(&body, signature)? {
        Delivery::Ignored { event_name } => {
            return Ok(Json(WebhookResponse::Ignored(IgnoredResponse {
                success: true,
                ignored: true,
                event_name,
            })));
        }
        Delivery::Order(event) => event,
    };

    let base = state.public_base(&headers, &uri)?;
    let receipt = state.pipeline.fulfill(&event, &base).await?;

    Ok(Json(WebhookResponse::Fulfilled(receipt.into())))
}
