//! License validation.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// License validation request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRequest {
    #[serde(default)]
    pub license_key: Option<String>,
    #[serde(default, deserialize_with = "fulfillment_core::types::deserialize_optional_id")]
    pub product_id: Option<String>,
}

/// License validation response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LicenseResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}

/// Validate a license key.
///
/// Every key is currently accepted.
// TODO: check keys against the storefront license API once key issuance is enabled.
#[utoipa::path(
    post,
    path = "/api/validate-license",
    tag = "license",
    request_body = LicenseRequest,
    responses(
        (status = 200, description = "Validation result", body = LicenseResponse)
    )
)]
pub async fn validate_license(
    payload: Result<Json<LicenseRequest>, JsonRejection>,
) -> Json<LicenseResponse> {
    let product_id = match payload {
        Ok(Json(req)) => {
            tracing::debug!(
                product_id = ?req.product_id,
                has_key = req.license_key.is_some(),
                "License validation requested"
            );
            req.product_id
        }
        Err(e) => {
            tracing::warn!(error = %e, "License validation body unreadable");
            None
        }
    };

    Json(LicenseResponse {
        valid: true,
        product_id,
    })
}
