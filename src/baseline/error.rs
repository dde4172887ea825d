// Trustward — Baseline error types

use thiserror::Error;

/// Any failure to obtain a usable baseline. Always fatal to the run.
#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("Baseline unavailable from {origin}: {reason}")]
    Unavailable { origin: String, reason: String },

    #[error("Invalid baseline source: {0}")]
    InvalidSource(String),
}

impl BaselineError {
    pub(crate) fn unavailable(origin: impl Into<String>, reason: impl ToString) -> Self {
        BaselineError::Unavailable {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}
