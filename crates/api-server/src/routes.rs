//! API route definitions.

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use crate::handlers::{downloads, health, license, models, webhook};
use crate::state::AppState;

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Plans Fulfillment API",
        version = "1.0.0",
        description = "Purchase webhooks, personalized plan downloads and signed model URLs"
    ),
    paths(
        health::health_check,
        webhook::receive_webhook,
        downloads::download_plan,
        models::issue_model_url,
        models::redeem_model_url,
        license::validate_license,
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            health::HealthResponse,
            webhook::WebhookResponse,
            webhook::FulfilledResponse,
            webhook::IgnoredResponse,
            models::ModelUrlRequest,
            models::ModelUrlResponse,
            license::LicenseRequest,
            license::LicenseResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "fulfillment", description = "Order webhooks and plan downloads"),
        (name = "models", description = "Signed URLs for 3D models"),
        (name = "license", description = "License validation"),
    )
)]
pub struct ApiDoc;

/// Create the main router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))

        // Fulfillment endpoints
        .route("/webhook", post(webhook::receive_webhook))
        .route("/download/{*filename}", get(downloads::download_plan))

        // Model endpoints
        .route("/api/model-url", post(models::issue_model_url))
        .route("/models/{*path}", get(models::redeem_model_url))

        // License endpoints
        .route("/api/validate-license", post(license::validate_license))

        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))

        .fallback(|| async { ApiError::NotFound("Not Found".to_string()) })

        // Add state
        .with_state(state)
}
