// Trustward — Locator error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("Scan root does not exist or is not a directory: {0}")]
    RootNotFound(PathBuf),

    #[error("Invalid reference pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
