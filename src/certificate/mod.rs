// Trustward — Certificate Module
//
// Canonical certificate values. A certificate's identity is the SHA-256
// fingerprint of its DER encoding; labels, aliases and PEM whitespace never
// take part in equality.

mod codec;
mod error;
mod models;
mod set;

pub use codec::{
    count_certificate_markers, has_certificate_block, parse_certificates, parse_labeled_blocks,
    parse_pem_bundle,
};
pub use error::CertificateError;
pub use models::{Certificate, Fingerprint};
pub use set::CertificateSet;
