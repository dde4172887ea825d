// Trustward — Store error types
//
// Every variant is a per-store failure. `kind()` folds them into the
// reporting taxonomy carried by modification records.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::certificate::CertificateError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store format could not be determined: {}", .0.display())]
    FormatUnknown(PathBuf),

    #[error("No candidate credential opened the store ({tried} tried)")]
    CredentialExhausted { tried: usize },

    #[error("{tool} failed: {detail}")]
    ExternalTool { tool: String, detail: String },

    #[error("{tool} is not available: {detail}")]
    ToolUnavailable { tool: String, detail: String },

    #[error("{tool} timed out after {}s", .timeout.as_secs())]
    Timeout { tool: String, timeout: Duration },

    #[error("Malformed store {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Backup failed: {0}")]
    Backup(String),

    #[error("Certificate error: {0}")]
    Certificate(#[from] CertificateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::FormatUnknown(_) => ErrorKind::FormatUnknown,
            StoreError::CredentialExhausted { .. } => ErrorKind::CredentialExhausted,
            StoreError::ExternalTool { .. }
            | StoreError::ToolUnavailable { .. }
            | StoreError::Timeout { .. } => ErrorKind::ExternalToolFailure,
            StoreError::Malformed { .. } | StoreError::Certificate(_) => ErrorKind::MalformedStore,
            StoreError::Verification(_) => ErrorKind::VerificationFailure,
            StoreError::Backup(_) => ErrorKind::BackupFailure,
            StoreError::Io(_) => ErrorKind::IoFailure,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        StoreError::Malformed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failure taxonomy as reported per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FormatUnknown,
    CredentialExhausted,
    ExternalToolFailure,
    MalformedStore,
    VerificationFailure,
    BackupFailure,
    IoFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::FormatUnknown => "FormatUnknown",
            ErrorKind::CredentialExhausted => "CredentialExhausted",
            ErrorKind::ExternalToolFailure => "ExternalToolFailure",
            ErrorKind::MalformedStore => "MalformedStore",
            ErrorKind::VerificationFailure => "VerificationFailure",
            ErrorKind::BackupFailure => "BackupFailure",
            ErrorKind::IoFailure => "IoFailure",
        };
        f.write_str(name)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
