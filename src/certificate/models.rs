// Trustward — Certificate data models
//
// A `Certificate` is immutable once built: it owns its DER bytes and the
// values derived from them. Any change to a store produces new values.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use super::CertificateError;

/// SHA-256 digest over a certificate's DER encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Compute the fingerprint of arbitrary bytes.
    pub fn of(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// Lowercase hex of the first four bytes, used in generated labels.
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Colon-separated uppercase hex, the form `openssl x509 -fingerprint` prints.
impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An X.509 certificate in canonical form.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    fingerprint: Fingerprint,
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl Certificate {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: Vec<u8>) -> Result<Self, CertificateError> {
        let (subject, issuer, not_before, not_after) = {
            let (_, parsed) = x509_parser::parse_x509_certificate(&der)
                .map_err(|e| CertificateError::X509(e.to_string()))?;
            let validity = parsed.validity();
            (
                parsed.subject().to_string(),
                parsed.issuer().to_string(),
                timestamp_to_utc(validity.not_before.timestamp()),
                timestamp_to_utc(validity.not_after.timestamp()),
            )
        };

        let fingerprint = Fingerprint::of(&der);

        Ok(Self {
            der,
            fingerprint,
            subject,
            issuer,
            not_before,
            not_after,
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Encode as a single `CERTIFICATE` PEM block with LF line endings.
    pub fn to_pem(&self) -> String {
        let block = pem::Pem::new("CERTIFICATE", self.der.clone());
        pem::encode_config(
            &block,
            pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
        )
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.not_after
    }
}

fn timestamp_to_utc(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl Eq for Certificate {}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("fingerprint", &self.fingerprint)
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("not_after", &self.not_after)
            .finish()
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.subject, self.fingerprint.short())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
