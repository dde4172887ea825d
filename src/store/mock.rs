// Trustward — Test doubles for store adapters
//
// `MockKeystore` keeps a password-protected store in a real file (a
// `secret=` line followed by PEM blocks), so backups, digests and rollbacks
// operate on real bytes without keytool or openssl.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use super::adapter::{generate_label, write_atomic};
use super::{AddOutcome, Credential, StoreAdapter, StoreError, StoreFormat};
use crate::certificate::{parse_pem_bundle, Certificate, CertificateSet, Fingerprint};

const SECRET_PREFIX: &str = "secret=";

/// A fresh self-signed certificate.
pub fn self_signed(name: &str) -> Certificate {
    let key = rcgen::generate_simple_self_signed(vec![name.to_string()]).unwrap();
    Certificate::from_der(key.cert.der().to_vec()).unwrap()
}

/// Password-checking adapter that records every credential it is offered.
pub struct MockKeystore {
    format: StoreFormat,
    attempts: Mutex<Vec<String>>,
}

impl MockKeystore {
    pub fn new(format: StoreFormat) -> Self {
        Self {
            format,
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn create(path: &Path, password: &str, certs: &[Certificate]) -> io::Result<()> {
        let mut content = format!("{}{}\n", SECRET_PREFIX, password);
        for cert in certs {
            content.push_str(&cert.to_pem());
        }
        fs::write(path, content)
    }

    /// Credentials offered to `list`, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    fn open(&self, path: &Path, credential: &Credential) -> Result<(String, CertificateSet), StoreError> {
        let offered = credential.expose().unwrap_or("<none>").to_string();
        self.attempts.lock().unwrap().push(offered.clone());

        let text = fs::read_to_string(path)?;
        let (first, rest) = text.split_once('\n').unwrap_or((text.as_str(), ""));
        let Some(password) = first.strip_prefix(SECRET_PREFIX) else {
            return Err(StoreError::malformed(path, "missing secret line"));
        };
        if password != offered {
            return Err(StoreError::ExternalTool {
                tool: "mock".into(),
                detail: "keystore password was incorrect".into(),
            });
        }

        let certs = parse_pem_bundle(rest.as_bytes())?;
        Ok((text.clone(), certs.into_iter().collect()))
    }
}

#[async_trait]
impl StoreAdapter for MockKeystore {
    fn format(&self) -> StoreFormat {
        self.format
    }

    async fn list(&self, path: &Path, credential: &Credential) -> Result<CertificateSet, StoreError> {
        self.open(path, credential).map(|(_, set)| set)
    }

    async fn add_certificate(
        &self,
        path: &Path,
        credential: &Credential,
        cert: &Certificate,
    ) -> Result<AddOutcome, StoreError> {
        let (mut text, set) = self.open(path, credential)?;
        if set.contains(cert.fingerprint()) {
            return Ok(AddOutcome::AlreadyPresent);
        }
        text.push_str(&cert.to_pem());
        write_atomic(path, text.as_bytes())?;
        Ok(AddOutcome::Added {
            label: generate_label(cert.fingerprint()),
        })
    }
}

/// Opens like `MockKeystore` but every addition scribbles over the store
/// and then fails, like a tool dying mid-write.
pub struct FailingAdapter {
    inner: MockKeystore,
}

impl FailingAdapter {
    pub fn new(format: StoreFormat) -> Self {
        Self {
            inner: MockKeystore::new(format),
        }
    }
}

#[async_trait]
impl StoreAdapter for FailingAdapter {
    fn format(&self) -> StoreFormat {
        self.inner.format()
    }

    async fn list(&self, path: &Path, credential: &Credential) -> Result<CertificateSet, StoreError> {
        self.inner.list(path, credential).await
    }

    async fn add_certificate(
        &self,
        path: &Path,
        _credential: &Credential,
        _cert: &Certificate,
    ) -> Result<AddOutcome, StoreError> {
        fs::write(path, b"half-written")?;
        Err(StoreError::ExternalTool {
            tool: "mock".into(),
            detail: "exit 1: import failed".into(),
        })
    }
}

/// Delegates everything except `verify`, which always reports failure.
pub struct SabotagedVerify<A> {
    inner: A,
}

impl<A> SabotagedVerify<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<A: StoreAdapter> StoreAdapter for SabotagedVerify<A> {
    fn format(&self) -> StoreFormat {
        self.inner.format()
    }

    async fn list(&self, path: &Path, credential: &Credential) -> Result<CertificateSet, StoreError> {
        self.inner.list(path, credential).await
    }

    async fn add_certificate(
        &self,
        path: &Path,
        credential: &Credential,
        cert: &Certificate,
    ) -> Result<AddOutcome, StoreError> {
        self.inner.add_certificate(path, credential, cert).await
    }

    async fn verify(
        &self,
        _path: &Path,
        _credential: &Credential,
        _expected: &[Fingerprint],
    ) -> Result<bool, StoreError> {
        Ok(false)
    }
}
