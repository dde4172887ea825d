// Trustward — Certificate error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("PEM decoding failed: {0}")]
    Pem(#[from] pem::PemError),

    #[error("X.509 parsing failed: {0}")]
    X509(String),

    #[error("No certificate found in input")]
    Empty,

    #[error("Unterminated certificate block after line {0}")]
    Unterminated(usize),
}
