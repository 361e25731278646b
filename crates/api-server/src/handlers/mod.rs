//! API request handlers.

pub mod downloads;
pub mod health;
pub mod license;
pub mod models;
pub mod webhook;
