//! Rendered, persisted plan copies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Key prefix for rendered orders in the documents bucket.
pub const ORDERS_PREFIX: &str = "orders/";

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A rendered copy written to the documents bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredArtifact {
    pub key: String,
    pub content_type: String,
    pub size: usize,
    pub metadata: BTreeMap<String, String>,
}

impl StoredArtifact {
    /// File name as exposed on the download route.
    pub fn filename(&self) -> &str {
        download_filename(&self.key)
    }
}

/// Storage key `orders/order-<orderId>_<epochMillis>.pdf`.
///
/// Characters outside `[A-Za-z0-9_-]` in the order id become `-` so the
/// key always satisfies the download filename pattern.
pub fn artifact_key(order_id: &str, at: DateTime<Utc>) -> String {
    let safe_id: String = order_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("{}order-{}_{}.pdf", ORDERS_PREFIX, safe_id, at.timestamp_millis())
}

/// Strip the orders prefix from a storage key.
pub fn download_filename(key: &str) -> &str {
    key.strip_prefix(ORDERS_PREFIX).unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_artifact_key_layout() {
        let at = Utc.timestamp_millis_opt(1_772_366_400_123).unwrap();
        let key = artifact_key("1001", at);

        assert_eq!(key, "orders/order-1001_1772366400123.pdf");
        assert_eq!(download_filename(&key), "order-1001_1772366400123.pdf");
    }

    #[test]
    fn test_artifact_key_sanitizes_order_id() {
        let at = Utc.timestamp_millis_opt(5).unwrap();
        assert_eq!(artifact_key("../a b#1", at), "orders/order----a-b-1_5.pdf");
    }

    #[test]
    fn test_artifact_keys_differ_over_time() {
        let a = artifact_key("1001", Utc.timestamp_millis_opt(1).unwrap());
        let b = artifact_key("1001", Utc.timestamp_millis_opt(2).unwrap());
        assert_ne!(a, b);
    }
}
