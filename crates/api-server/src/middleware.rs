//! CORS middleware.
//!
//! Every response carries the same CORS headers, and any `OPTIONS` request is
//! answered with `204 No Content` before routing.

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderValue, Method, Request, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

/// Header values applied by [`cors`].
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_headers: HeaderValue,
}

impl CorsPolicy {
    /// `permissive` allows any request header (development only).
    pub fn new(permissive: bool) -> Self {
        let allow_headers = if permissive { "*" } else { ALLOWED_HEADERS };
        Self {
            allow_headers: HeaderValue::from_static(allow_headers),
        }
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Answer preflights and stamp CORS headers on every response.
pub async fn cors(
    State(policy): State<CorsPolicy>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        tracing::debug!(uri = %request.uri(), "Answering preflight");
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, policy.allow_headers);
    response
}
