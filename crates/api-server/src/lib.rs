//! API Server
//!
//! HTTP front of the plans fulfillment service.
//!
//! # Features
//!
//! - **Webhook**: signed purchase notifications turned into personalized PDFs
//! - **Downloads**: rendered plans served by file name
//! - **Model URLs**: time-limited signed links to protected 3D models
//! - **OpenAPI**: Auto-generated Swagger documentation
//!
//! # Example
//!
//! ```ignore
//! use api_server::{ApiServer, AppState, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! let state = AppState::from_config(&FulfillmentConfig::from_env()?, None)?;
//! ApiServer::new(config, state).run().await?;
//! ```

pub mod email;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use email::{EmailClient, EmailConfig};
pub use error::ApiError;
pub use middleware::CorsPolicy;
pub use routes::create_router;
pub use state::AppState;

use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{info, Level};
use url::Url;

/// Request bodies above this size are rejected.
pub const BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Origin used in generated links instead of the request's Host header.
    pub public_base_url: Option<Url>,
    /// Allow any request header in CORS responses (development only).
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_base_url: None,
            cors_permissive: false,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let public_base_url = match std::env::var("PUBLIC_BASE_URL") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                Url::parse(raw.trim())
                    .map_err(|e| anyhow::anyhow!("PUBLIC_BASE_URL is not a valid URL: {}", e))?,
            ),
            _ => None,
        };

        Ok(Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            // Check PORT first (hosting platforms), then API_PORT, then default to 3000
            port: std::env::var("PORT")
                .or_else(|_| std::env::var("API_PORT"))
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            public_base_url,
            cors_permissive: std::env::var("CORS_PERMISSIVE")
                .map(|v| v == "true")
                .unwrap_or(false),
        })
    }

    /// Get the socket address.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }
}

/// Router with tracing, body limit and CORS layers applied.
pub fn build_app(state: Arc<AppState>, cors_policy: CorsPolicy) -> Router {
    create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .on_request(|request: &Request<_>, _span: &tracing::Span| {
                    tracing::info!(
                        method = %request.method(),
                        uri = %request.uri().path(),
                        "Incoming request"
                    );
                })
                .on_response(DefaultOnResponse::new().level(Level::DEBUG))
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::error!(
                            error = %error,
                            latency_ms = latency.as_millis(),
                            "Request failed"
                        );
                    },
                ),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(axum::middleware::from_fn_with_state(
            cors_policy,
            middleware::cors,
        ))
}

/// The API server.
pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a new API server.
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        let state = match &config.public_base_url {
            Some(url) => state.with_public_base_url(Some(url.clone())),
            None => state,
        };
        Self { config, state }
    }

    /// Run the server.
    pub async fn run(self) -> anyhow::Result<()> {
        let router = build_app(
            Arc::new(self.state),
            CorsPolicy::new(self.config.cors_permissive),
        );

        let addr = self.config.socket_addr()?;
        info!(address = %addr, "Starting API server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
