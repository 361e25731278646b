//! Error types for the fulfillment pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid webhook signature")]
    BadSignature,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template could not be loaded: {0}")]
    TemplateLoad(String),

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Signing error: {0}")]
    Signing(#[from] auth::SigningError),
}

pub type Result<T> = std::result::Result<T, Error>;
