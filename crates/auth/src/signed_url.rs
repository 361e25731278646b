//! Time-boxed download URLs for protected assets.
//!
//! A token binds a resource path and an expiry instant (epoch milliseconds)
//! under `HMAC(secret, "<resource>:<expires>")`. Tokens are not stored: a
//! URL is valid until it expires, by anyone who holds it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::signer::{Signer, SigningError};

/// Default lifetime of an issued URL.
pub const DEFAULT_URL_TTL_SECS: i64 = 3600;

/// Longest accepted lifetime (30 days).
pub const MAX_URL_TTL_SECS: i64 = 30 * 24 * 3600;

/// Signed URL errors.
#[derive(Debug, Error)]
pub enum SignedUrlError {
    #[error("Missing {0} parameter")]
    MissingParameter(&'static str),

    #[error("Malformed expiry: {0}")]
    MalformedExpiry(String),

    #[error("URL expired at {expires_at_ms}")]
    Expired { expires_at_ms: i64 },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid resource path: {0}")]
    InvalidResource(String),

    #[error("Expiry out of range")]
    ExpiryOverflow,

    #[error("Cannot build URL from base: {0}")]
    InvalidBase(String),

    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// An issued download token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlToken {
    pub resource_path: String,
    pub expires_at_ms: i64,
    pub signature: String,
}

impl SignedUrlToken {
    /// Compose `<base>/<route>/<resource>?expires=..&signature=..`.
    ///
    /// Each path segment of the resource is percent-encoded separately so the
    /// router hands the original resource path back on redemption.
    pub fn to_url(&self, base: &Url, route: &str) -> Result<Url, SignedUrlError> {
        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SignedUrlError::InvalidBase(base.to_string()))?;
            segments.pop_if_empty();
            segments.extend(route.split('/').filter(|s| !s.is_empty()));
            segments.extend(self.resource_path.split('/'));
        }
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("expires", &self.expires_at_ms.to_string())
            .append_pair("signature", &self.signature);
        Ok(url)
    }
}

/// Issues and verifies signed URLs for one secret and lifetime.
#[derive(Debug, Clone)]
pub struct UrlSigner {
    signer: Signer,
    ttl: Duration,
}

impl UrlSigner {
    /// Create a URL signer with the given secret and lifetime.
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            signer: Signer::new(secret),
            ttl,
        }
    }

    /// Lifetime of issued URLs.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `resource` that expires `ttl` after `now`.
    pub fn issue(&self, resource: &str, now: DateTime<Utc>) -> Result<SignedUrlToken, SignedUrlError> {
        validate_resource(resource)?;

        let expires_at_ms = now
            .checked_add_signed(self.ttl)
            .ok_or(SignedUrlError::ExpiryOverflow)?
            .timestamp_millis();
        let signature = self
            .signer
            .sign(Self::message(resource, expires_at_ms).as_bytes())?;

        Ok(SignedUrlToken {
            resource_path: resource.to_string(),
            expires_at_ms,
            signature,
        })
    }

    /// Check redemption parameters for `resource` at instant `now`.
    ///
    /// Returns the expiry on success. Checks run in order: presence of both
    /// parameters, expiry, then signature.
    pub fn verify(
        &self,
        resource: &str,
        expires: Option<&str>,
        signature: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<i64, SignedUrlError> {
        let expires = expires
            .filter(|v| !v.is_empty())
            .ok_or(SignedUrlError::MissingParameter("expires"))?;
        let signature = signature
            .filter(|v| !v.is_empty())
            .ok_or(SignedUrlError::MissingParameter("signature"))?;

        let expires_at_ms: i64 = expires
            .parse()
            .map_err(|_| SignedUrlError::MalformedExpiry(expires.to_string()))?;

        if now.timestamp_millis() > expires_at_ms {
            return Err(SignedUrlError::Expired { expires_at_ms });
        }

        let message = Self::message(resource, expires_at_ms);
        if !self.signer.verify(message.as_bytes(), signature) {
            return Err(SignedUrlError::InvalidSignature);
        }

        Ok(expires_at_ms)
    }

    fn message(resource: &str, expires_at_ms: i64) -> String {
        format!("{}:{}", resource, expires_at_ms)
    }
}

/// Resource names are relative paths without traversal segments.
fn validate_resource(resource: &str) -> Result<(), SignedUrlError> {
    let invalid = resource.trim().is_empty()
        || resource.starts_with('/')
        || resource.contains('\\')
        || resource
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        return Err(SignedUrlError::InvalidResource(resource.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn signer() -> UrlSigner {
        UrlSigner::new("url-secret", Duration::seconds(DEFAULT_URL_TTL_SECS))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_issue_sets_expiry_from_ttl() {
        let token = signer().issue("workbench.glb", t0()).unwrap();

        assert_eq!(token.resource_path, "workbench.glb");
        assert_eq!(
            token.expires_at_ms,
            t0().timestamp_millis() + DEFAULT_URL_TTL_SECS * 1000
        );
        assert_eq!(
            token.signature,
            crate::sign(
                format!("workbench.glb:{}", token.expires_at_ms).as_bytes(),
                b"url-secret"
            )
            .unwrap()
        );
    }

    #[test]
    fn test_issue_past_calendar_range_fails() {
        let s = UrlSigner::new("url-secret", Duration::seconds(10_000_000_000_000));
        let err = s.issue("workbench.glb", t0()).unwrap_err();
        assert!(matches!(err, SignedUrlError::ExpiryOverflow));

        let longest = UrlSigner::new("url-secret", Duration::seconds(MAX_URL_TTL_SECS));
        assert!(longest.issue("workbench.glb", t0()).is_ok());
    }

    #[test]
    fn test_redeem_until_expiry_inclusive() {
        let s = signer();
        let token = s.issue("chair/model.glb", t0()).unwrap();
        let expires = token.expires_at_ms.to_string();

        for offset_ms in [0, 1, 1_800_000, 3_599_999, 3_600_000] {
            let now = t0() + Duration::milliseconds(offset_ms);
            assert!(
                s.verify("chair/model.glb", Some(&expires), Some(&token.signature), now)
                    .is_ok(),
                "rejected at +{offset_ms}ms"
            );
        }
    }

    #[test]
    fn test_redeem_after_expiry_rejected() {
        let s = signer();
        let token = s.issue("chair/model.glb", t0()).unwrap();
        let expires = token.expires_at_ms.to_string();

        for offset_ms in [3_600_001, 7_200_000] {
            let now = t0() + Duration::milliseconds(offset_ms);
            let err = s
                .verify("chair/model.glb", Some(&expires), Some(&token.signature), now)
                .unwrap_err();
            assert!(matches!(err, SignedUrlError::Expired { .. }));
        }
    }

    #[test]
    fn test_signature_for_other_path_rejected() {
        let s = signer();
        let token = s.issue("free/sample.glb", t0()).unwrap();
        let expires = token.expires_at_ms.to_string();

        let err = s
            .verify("paid/workbench.glb", Some(&expires), Some(&token.signature), t0())
            .unwrap_err();
        assert!(matches!(err, SignedUrlError::InvalidSignature));
    }

    #[test]
    fn test_extended_expiry_rejected() {
        let s = signer();
        let token = s.issue("workbench.glb", t0()).unwrap();
        let forged = (token.expires_at_ms + 86_400_000).to_string();

        let err = s
            .verify("workbench.glb", Some(&forged), Some(&token.signature), t0())
            .unwrap_err();
        assert!(matches!(err, SignedUrlError::InvalidSignature));
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = signer().issue("workbench.glb", t0()).unwrap();
        let other = UrlSigner::new("other-secret", Duration::hours(1));
        let expires = token.expires_at_ms.to_string();

        assert!(other
            .verify("workbench.glb", Some(&expires), Some(&token.signature), t0())
            .is_err());
    }

    #[test]
    fn test_missing_parameters_rejected() {
        let s = signer();
        assert!(matches!(
            s.verify("a.glb", None, Some("abc"), t0()),
            Err(SignedUrlError::MissingParameter("expires"))
        ));
        assert!(matches!(
            s.verify("a.glb", Some("1"), None, t0()),
            Err(SignedUrlError::MissingParameter("signature"))
        ));
        assert!(matches!(
            s.verify("a.glb", Some(""), Some("abc"), t0()),
            Err(SignedUrlError::MissingParameter("expires"))
        ));
    }

    #[test]
    fn test_malformed_expiry_rejected() {
        let err = signer()
            .verify("a.glb", Some("tomorrow"), Some("abc"), t0())
            .unwrap_err();
        assert!(matches!(err, SignedUrlError::MalformedExpiry(_)));
    }

    #[test]
    fn test_invalid_resources_rejected() {
        for resource in ["", "  ", "/etc/passwd", "../secret.glb", "a/../../b", "a//b", "a\\b", "a/./b"] {
            assert!(
                matches!(
                    signer().issue(resource, t0()),
                    Err(SignedUrlError::InvalidResource(_))
                ),
                "accepted {resource:?}"
            );
        }
    }

    #[test]
    fn test_to_url_composes_path_and_query() {
        let token = SignedUrlToken {
            resource_path: "chairs/lounge chair.glb".to_string(),
            expires_at_ms: 1_772_370_000_000,
            signature: "abc123".to_string(),
        };
        let base = Url::parse("https://plans.example.com/").unwrap();

        let url = token.to_url(&base, "/models").unwrap();
        assert_eq!(
            url.as_str(),
            "https://plans.example.com/models/chairs/lounge%20chair.glb?expires=1772370000000&signature=abc123"
        );
    }

    #[test]
    fn test_to_url_keeps_base_path_prefix() {
        let token = SignedUrlToken {
            resource_path: "a.glb".to_string(),
            expires_at_ms: 5,
            signature: "ff".to_string(),
        };
        let base = Url::parse("https://worker.example.com/fulfillment").unwrap();

        let url = token.to_url(&base, "models").unwrap();
        assert_eq!(
            url.as_str(),
            "https://worker.example.com/fulfillment/models/a.glb?expires=5&signature=ff"
        );
    }
}
