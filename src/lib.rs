//! Plans Fulfillment: watermarked plan delivery and signed model downloads
//!
//! This is the root crate that provides benchmark access to the internal modules.
//! For actual functionality, use the individual crates directly:
//!
//! - `fulfillment-core`: Webhook parsing, PDF watermarking, storage, pipeline
//! - `auth`: HMAC signing and time-limited signed URLs
//! - `api-server`: HTTP API server

// Re-export for benchmarks
pub use auth as signing;
pub use fulfillment_core as core;
