// Trustward — Configuration error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Concurrency must be between 1 and {}", super::MAX_CONCURRENCY)]
    InvalidConcurrency,

    #[error("Tool timeout must be greater than zero")]
    InvalidTimeout,

    #[error("At least one password candidate is required")]
    NoCandidates,

    #[error("Backup retention must be at least one day")]
    InvalidRetention,
}
