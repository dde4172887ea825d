// Trustward — PEM bundle adapter
//
// Plain-text stores are handled in-process. Additions rewrite the whole file
// through a sibling temporary file, so a crash mid-write leaves the original
// intact. `# ` comment lines preceding a block are treated as its label.

use std::path::Path;

use async_trait::async_trait;

use super::adapter::{blocking_io, generate_label, write_atomic};
use super::{AddOutcome, Credential, StoreAdapter, StoreError, StoreFormat};
use crate::certificate::{count_certificate_markers, parse_labeled_blocks, Certificate, CertificateSet};

const LABEL_PREFIX: &str = "# ";

pub struct PemBundleAdapter;

impl PemBundleAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PemBundleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a bundle strictly: every BEGIN marker must yield a certificate.
fn parse_bundle(path: &Path, bytes: &[u8]) -> Result<CertificateSet, StoreError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| StoreError::malformed(path, "bundle is not UTF-8 text"))?;

    let mut set = CertificateSet::new();
    if text.trim().is_empty() {
        return Ok(set);
    }

    let blocks = parse_labeled_blocks(text, LABEL_PREFIX)
        .map_err(|e| StoreError::malformed(path, e))?;
    if blocks.is_empty() {
        return Err(StoreError::malformed(path, "no PEM certificate blocks"));
    }

    let markers = count_certificate_markers(text);
    if markers != blocks.len() {
        return Err(StoreError::malformed(
            path,
            format!("{} certificate markers but {} parsed blocks", markers, blocks.len()),
        ));
    }

    for (label, cert) in blocks {
        set.insert_labeled(cert, label);
    }
    Ok(set)
}

/// Existing text plus one labelled block, separated by exactly one newline.
fn append_block(existing: &[u8], label: &str, cert: &Certificate) -> Vec<u8> {
    let mut out = existing.to_vec();
    if !out.is_empty() && !out.ends_with(b"\n") {
        out.push(b'\n');
    }
    out.extend_from_slice(LABEL_PREFIX.as_bytes());
    out.extend_from_slice(label.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(cert.to_pem().as_bytes());
    out
}

#[async_trait]
impl StoreAdapter for PemBundleAdapter {
    fn format(&self) -> StoreFormat {
        StoreFormat::PemBundle
    }

    async fn list(&self, path: &Path, _credential: &Credential) -> Result<CertificateSet, StoreError> {
        let bytes = tokio::fs::read(path).await?;
        parse_bundle(path, &bytes)
    }

    async fn add_certificate(
        &self,
        path: &Path,
        _credential: &Credential,
        cert: &Certificate,
    ) -> Result<AddOutcome, StoreError> {
        let existing = tokio::fs::read(path).await?;
        if parse_bundle(path, &existing)?.contains(cert.fingerprint()) {
            return Ok(AddOutcome::AlreadyPresent);
        }

        let label = generate_label(cert.fingerprint());
        let updated = append_block(&existing, &label, cert);
        let target = path.to_path_buf();
        blocking_io(move || write_atomic(&target, &updated)).await?;

        tracing::debug!(path = %path.display(), label = %label, "Appended certificate block");
        Ok(AddOutcome::Added { label })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
