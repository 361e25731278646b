//! Configuration management for the fulfillment service.

use crate::catalog::ProductCatalog;
use crate::pipeline::UnsignedWebhookPolicy;
use crate::watermark::{RenderOptions, DEFAULT_AUTHOR};
use crate::{Error, Result};
use auth::{DEFAULT_URL_TTL_SECS, MAX_URL_TTL_SECS};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Fulfillment configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FulfillmentConfig {
    /// Storefront webhook secret; `None` disables verification.
    pub webhook_secret: Option<String>,
    pub unsigned_webhook_policy: UnsignedWebhookPolicy,
    pub url_signing_secret: String,
    pub signed_url_ttl_secs: i64,
    pub storage: StorageConfig,
    pub product_catalog_path: Option<PathBuf>,
    pub watermark: WatermarkConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Templates, fonts and rendered orders.
    pub documents_dir: PathBuf,
    /// Protected 3D models.
    pub assets_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatermarkConfig {
    pub author: String,
    pub diagonal: bool,
}

impl WatermarkConfig {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            author: self.author.clone(),
            diagonal: self.diagonal,
            ..RenderOptions::default()
        }
    }
}

impl FulfillmentConfig {
    /// Load configuration from environment variables.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Empty values count
    /// as unset.
    #[allow(clippy::result_large_err)]
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let unsigned_webhook_policy = match var("UNSIGNED_WEBHOOK_POLICY") {
            None => UnsignedWebhookPolicy::default(),
            Some(raw) => raw.parse().map_err(|message| Error::Config { message })?,
        };

        let signed_url_ttl_secs = match var("SIGNED_URL_TTL_SECS") {
            None => DEFAULT_URL_TTL_SECS,
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|secs| (1..=MAX_URL_TTL_SECS).contains(secs))
                .ok_or_else(|| Error::Config {
                    message: format!(
                        "SIGNED_URL_TTL_SECS must be between 1 and {}, got {:?}",
                        MAX_URL_TTL_SECS, raw
                    ),
                })?,
        };

        let diagonal = match var("WATERMARK_DIAGONAL") {
            None => true,
            Some(raw) => parse_flag(&raw).ok_or_else(|| Error::Config {
                message: format!("WATERMARK_DIAGONAL must be true or false, got {:?}", raw),
            })?,
        };

        Ok(Self {
            webhook_secret: var("LEMON_SQUEEZY_WEBHOOK_SECRET"),
            unsigned_webhook_policy,
            url_signing_secret: var("URL_SIGNING_SECRET").ok_or_else(|| Error::Config {
                message: "URL_SIGNING_SECRET environment variable not set".to_string(),
            })?,
            signed_url_ttl_secs,
            storage: StorageConfig {
                documents_dir: var("DOCUMENTS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("data/documents")),
                assets_dir: var("ASSETS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("data/assets")),
            },
            product_catalog_path: var("PRODUCT_CATALOG_PATH").map(PathBuf::from),
            watermark: WatermarkConfig {
                author: var("WATERMARK_AUTHOR").unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
                diagonal,
            },
        })
    }

    /// The configured catalog file, or the built-in catalog.
    #[allow(clippy::result_large_err)]
    pub fn load_catalog(&self) -> Result<ProductCatalog> {
        match &self.product_catalog_path {
            Some(path) => ProductCatalog::from_file(path),
            None => Ok(ProductCatalog::default()),
        }
    }

    /// Load configuration for testing (with defaults).
    #[cfg(any(test, feature = "testing"))]
    pub fn test_config() -> Self {
        Self {
            webhook_secret: Some("test-webhook-secret".to_string()),
            unsigned_webhook_policy: UnsignedWebhookPolicy::Allow,
            url_signing_secret: "test-url-secret".to_string(),
            signed_url_ttl_secs: DEFAULT_URL_TTL_SECS,
            storage: StorageConfig {
                documents_dir: PathBuf::from("target/test-data/documents"),
                assets_dir: PathBuf::from("target/test-data/assets"),
            },
            product_catalog_path: None,
            watermark: WatermarkConfig {
                author: DEFAULT_AUTHOR.to_string(),
                diagonal: true,
            },
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<FulfillmentConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        FulfillmentConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("URL_SIGNING_SECRET", "s3cret")]).unwrap();

        assert_eq!(config.webhook_secret, None);
        assert_eq!(config.unsigned_webhook_policy, UnsignedWebhookPolicy::Allow);
        assert_eq!(config.signed_url_ttl_secs, 3600);
        assert_eq!(config.storage.documents_dir, PathBuf::from("data/documents"));
        assert_eq!(config.watermark.author, "DIY Furniture Project");
        assert!(config.watermark.diagonal);
        assert_eq!(config.load_catalog().unwrap(), ProductCatalog::default());
    }

    #[test]
    fn test_url_signing_secret_required() {
        assert!(matches!(load(&[]), Err(Error::Config { .. })));
        assert!(matches!(
            load(&[("URL_SIGNING_SECRET", "  ")]),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_empty_webhook_secret_is_unset() {
        let config = load(&[
            ("URL_SIGNING_SECRET", "s"),
            ("LEMON_SQUEEZY_WEBHOOK_SECRET", ""),
        ])
        .unwrap();
        assert_eq!(config.webhook_secret, None);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("URL_SIGNING_SECRET", "s"),
            ("LEMON_SQUEEZY_WEBHOOK_SECRET", "whsec"),
            ("UNSIGNED_WEBHOOK_POLICY", "Reject"),
            ("SIGNED_URL_TTL_SECS", "600"),
            ("ASSETS_DIR", "/srv/models"),
            ("WATERMARK_DIAGONAL", "off"),
            ("WATERMARK_AUTHOR", "Workshop"),
        ])
        .unwrap();

        assert_eq!(config.webhook_secret.as_deref(), Some("whsec"));
        assert_eq!(config.unsigned_webhook_policy, UnsignedWebhookPolicy::Reject);
        assert_eq!(config.signed_url_ttl_secs, 600);

        let longest = load(&[("URL_SIGNING_SECRET", "s"), ("SIGNED_URL_TTL_SECS", "2592000")]).unwrap();
        assert_eq!(longest.signed_url_ttl_secs, MAX_URL_TTL_SECS);
        assert_eq!(config.storage.assets_dir, PathBuf::from("/srv/models"));

        let options = config.watermark.render_options();
        assert!(!options.diagonal);
        assert_eq!(options.author, "Workshop");
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("UNSIGNED_WEBHOOK_POLICY", "sometimes"),
            ("SIGNED_URL_TTL_SECS", "0"),
            ("SIGNED_URL_TTL_SECS", "soon"),
            ("SIGNED_URL_TTL_SECS", "10000000000000"),
            ("SIGNED_URL_TTL_SECS", "2592001"),
            ("WATERMARK_DIAGONAL", "maybe"),
        ] {
            let result = load(&[("URL_SIGNING_SECRET", "s"), (key, value)]);
            assert!(matches!(result, Err(Error::Config { .. })), "{key}={value}");
        }
    }
}
