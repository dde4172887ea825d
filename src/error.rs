// Trustward — Top-level error types
//
// Aggregates the module errors into one enum for the application boundary.
// Per-store failures never reach this type; they end up in run records.

use thiserror::Error;

/// Top-level error type for all Trustward operations.
#[derive(Debug, Error)]
pub enum TrustwardError {
    #[error("Discovery error: {0}")]
    Locator(#[from] crate::locator::LocatorError),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Baseline error: {0}")]
    Baseline(#[from] crate::baseline::BaselineError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::reconcile::ConfigError),

    #[error("Certificate error: {0}")]
    Certificate(#[from] crate::certificate::CertificateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TrustwardError>;
