//! Application state shared across handlers.

use axum::http::header::HOST;
use axum::http::{HeaderMap, Uri};
use chrono::Duration;
use std::sync::Arc;
use url::Url;

use auth::UrlSigner;
use fulfillment_core::{
    BlobStore, Clock, FsBlobStore, FulfillmentConfig, FulfillmentPipeline, Notifier, SystemClock,
};

use crate::error::{ApiError, ApiResult};

const FORWARDED_PROTO: &str = "x-forwarded-proto";
const FORWARDED_HOST: &str = "x-forwarded-host";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Webhook fulfillment.
    pub pipeline: FulfillmentPipeline,
    /// Templates, fonts and rendered orders.
    pub documents: Arc<dyn BlobStore>,
    /// Protected 3D models.
    pub assets: Arc<dyn BlobStore>,
    /// Issues and checks model download URLs.
    pub url_signer: UrlSigner,
    pub clock: Arc<dyn Clock>,
    /// Externally visible origin; derived from request headers when unset.
    pub public_base_url: Option<Url>,
}

impl AppState {
    pub fn new(
        pipeline: FulfillmentPipeline,
        documents: Arc<dyn BlobStore>,
        assets: Arc<dyn BlobStore>,
        url_signer: UrlSigner,
    ) -> Self {
        Self {
            pipeline,
            documents,
            assets,
            url_signer,
            clock: Arc::new(SystemClock),
            public_base_url: None,
        }
    }

    /// Filesystem-backed state from configuration.
    pub fn from_config(
        config: &FulfillmentConfig,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> fulfillment_core::Result<Self> {
        let documents: Arc<dyn BlobStore> =
            Arc::new(FsBlobStore::new(&config.storage.documents_dir));
        let assets: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.storage.assets_dir));
        let pipeline = FulfillmentPipeline::from_config(config, documents.clone(), notifier)?;
        let url_signer = UrlSigner::new(
            &config.url_signing_secret,
            Duration::seconds(config.signed_url_ttl_secs),
        );

        Ok(Self::new(pipeline, documents, assets, url_signer))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_public_base_url(mut self, url: Option<Url>) -> Self {
        self.public_base_url = url;
        self
    }

    /// Origin used in generated links: the configured base URL, else the
    /// request's forwarded host, `Host` header or URI authority.
    pub fn public_base(&self, headers: &HeaderMap, uri: &Uri) -> ApiResult<Url> {
        if let Some(url) = &self.public_base_url {
            return Ok(url.clone());
        }

        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.split(',').next().unwrap_or(v).trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = header(FORWARDED_HOST)
            .or_else(|| header(HOST.as_str()))
            .or_else(|| uri.authority().map(|authority| authority.to_string()))
            .ok_or_else(|| ApiError::BadRequest("Missing Host header".to_string()))?;
        let proto = match header(FORWARDED_PROTO).as_deref().or(uri.scheme_str()) {
            Some("https") => "https",
            _ => "http",
        };

        let url = Url::parse(&format!("{}://{}/", proto, host))
            .map_err(|e| ApiError::BadRequest(format!("Invalid Host header: {}", e)))?;
        if url.path() != "/" || url.query().is_some() {
            return Err(ApiError::BadRequest("Invalid Host header".to_string()));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use fulfillment_core::{MemoryBlobStore, ProductCatalog};

    fn state() -> AppState {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        AppState::new(
            FulfillmentPipeline::new(store.clone(), ProductCatalog::default()),
            store.clone(),
            store,
            UrlSigner::new("secret", Duration::seconds(60)),
        )
    }

    fn path() -> Uri {
        Uri::from_static("/webhook")
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_configured_base_wins() {
        let base = Url::parse("https://plans.example.com/").unwrap();
        let state = state().with_public_base_url(Some(base.clone()));

        assert_eq!(state.public_base(&headers(&[("host", "evil.test")]), &path()).unwrap(), base);
    }

    #[test]
    fn test_base_from_host() {
        let url = state().public_base(&headers(&[("host", "localhost:3000")]), &path()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/");
    }

    #[test]
    fn test_base_from_forwarded_headers() {
        let url = state()
            .public_base(&headers(&[
                ("host", "10.0.0.5:3000"),
                ("x-forwarded-host", "plans.example.com"),
                ("x-forwarded-proto", "https, http"),
            ]), &path())
            .unwrap();
        assert_eq!(url.as_str(), "https://plans.example.com/");
    }

    #[test]
    fn test_base_from_uri_authority() {
        let uri = Uri::from_static("https://plans.example.com:8443/webhook");
        let url = state().public_base(&HeaderMap::new(), &uri).unwrap();
        assert_eq!(url.as_str(), "https://plans.example.com:8443/");

        let url = state()
            .public_base(&headers(&[("host", "h.example.com")]), &uri)
            .unwrap();
        assert_eq!(url.as_str(), "https://h.example.com/");
    }

    #[test]
    fn test_missing_or_bad_host() {
        assert!(matches!(
            state().public_base(&HeaderMap::new(), &path()),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            state().public_base(&headers(&[("host", "a/b?c")]), &path()),
            Err(ApiError::BadRequest(_))
        ));
    }
}
