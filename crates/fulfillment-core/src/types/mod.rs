//! Domain types.

pub mod artifact;
pub mod event;
pub mod watermark;

pub use artifact::{artifact_key, download_filename, StoredArtifact, ORDERS_PREFIX, PDF_CONTENT_TYPE};
pub use event::{deserialize_optional_id, PurchaseEvent, WebhookPayload, ORDER_CREATED};
pub use watermark::WatermarkSpec;
