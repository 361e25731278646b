//! Fulfillment Core
//!
//! Domain logic for turning a purchase notification into a personalized,
//! downloadable plan:
//!
//! - `types`: purchase events, watermark parameters, stored artifacts
//! - `catalog`: product id to template mapping
//! - `storage`: blob store abstraction with memory and filesystem backends
//! - `watermark`: PDF stamping and metadata
//! - `pipeline`: verify, parse, render, persist, notify
//! - `notify`: purchase confirmation delivery

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod storage;
pub mod types;
pub mod watermark;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use catalog::{ProductCatalog, TemplateDescriptor};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{FulfillmentConfig, StorageConfig, WatermarkConfig};
pub use error::{Error, Result};
pub use notify::{Notifier, NotifyError, PurchaseEmail};
pub use pipeline::{
    Delivery, FulfillmentOutcome, FulfillmentPipeline, FulfillmentReceipt, UnsignedWebhookPolicy,
    CUSTOM_FONT_KEY, SIGNATURE_HEADER,
};
pub use storage::{BlobStore, FsBlobStore, MemoryBlobStore, ObjectMetadata, StoredObject};
pub use types::{PurchaseEvent, StoredArtifact, WatermarkSpec, WebhookPayload, ORDER_CREATED};
pub use watermark::{RenderOptions, WatermarkRenderer};
