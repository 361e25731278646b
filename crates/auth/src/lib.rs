//! Request Authentication
//!
//! HMAC-SHA256 signing shared by the purchase webhook check and the
//! time-boxed download URLs that protect model assets.

pub mod signed_url;
pub mod signer;

pub use signed_url::{SignedUrlError, SignedUrlToken, UrlSigner, DEFAULT_URL_TTL_SECS, MAX_URL_TTL_SECS};
pub use signer::{constant_time_eq, sign, verify, Signer, SigningError};
