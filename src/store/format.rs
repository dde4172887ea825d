// Trustward — Format classification
//
// Extension first, then content: magic bytes for binary keystores, PEM
// armour with a complete certificate block, and finally an openssl probe for
// DER-looking files that might be PKCS#12 archives.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use super::{StoreError, Toolchain};
use crate::certificate::has_certificate_block;

const JKS_MAGIC: [u8; 4] = [0xFE, 0xED, 0xFE, 0xED];
const JCEKS_MAGIC: [u8; 4] = [0xCE, 0xCE, 0xCE, 0xCE];
const DER_SEQUENCE: u8 = 0x30;

/// On-disk kind of a trust store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreFormat {
    BinaryKeystore,
    Pkcs12Archive,
    PemBundle,
    Unknown,
}

impl StoreFormat {
    /// Whether opening the store needs a password.
    pub fn requires_credential(self) -> bool {
        matches!(self, StoreFormat::BinaryKeystore | StoreFormat::Pkcs12Archive)
    }

    /// Format implied by the file suffix alone.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match ext.as_str() {
            "jks" | "keystore" | "truststore" => Some(StoreFormat::BinaryKeystore),
            "p12" | "pfx" => Some(StoreFormat::Pkcs12Archive),
            "pem" | "crt" | "cer" | "cert" => Some(StoreFormat::PemBundle),
            _ => None,
        }
    }
}

impl fmt::Display for StoreFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreFormat::BinaryKeystore => "keystore",
            StoreFormat::Pkcs12Archive => "pkcs12",
            StoreFormat::PemBundle => "pem",
            StoreFormat::Unknown => "unknown",
        };
        f.pad(name)
    }
}

/// Recognise a format from file content without running any tool.
pub fn sniff(bytes: &[u8]) -> Option<StoreFormat> {
    if bytes.len() >= 4 && (bytes[..4] == JKS_MAGIC || bytes[..4] == JCEKS_MAGIC) {
        return Some(StoreFormat::BinaryKeystore);
    }

    let text = String::from_utf8_lossy(bytes);
    if text.trim_start().starts_with("-----BEGIN") && has_certificate_block(&text) {
        return Some(StoreFormat::PemBundle);
    }

    None
}

/// Whether an `openssl pkcs12 -info` result means "this is an archive".
/// A wrong password still proves the structure parsed.
fn is_pkcs12_verdict(status: Option<i32>, stderr: &str) -> bool {
    match status {
        Some(0) => true,
        Some(1) => {
            let stderr = stderr.to_ascii_lowercase();
            stderr.contains("mac verify") || stderr.contains("invalid password")
        }
        _ => false,
    }
}

/// Determines the format of a discovered store.
pub struct Classifier {
    toolchain: Arc<Toolchain>,
}

impl Classifier {
    pub fn new(toolchain: Arc<Toolchain>) -> Self {
        Self { toolchain }
    }

    pub async fn classify(&self, path: &Path) -> Result<StoreFormat, StoreError> {
        if let Some(format) = StoreFormat::from_extension(path) {
            return Ok(format);
        }

        let bytes = tokio::fs::read(path).await?;
        if let Some(format) = sniff(&bytes) {
            return Ok(format);
        }

        if bytes.first() == Some(&DER_SEQUENCE) && self.is_pkcs12(path).await {
            return Ok(StoreFormat::Pkcs12Archive);
        }

        Ok(StoreFormat::Unknown)
    }

    async fn is_pkcs12(&self, path: &Path) -> bool {
        let args: Vec<OsString> = vec![
            "pkcs12".into(),
            "-info".into(),
            "-noout".into(),
            "-in".into(),
            path.into(),
            "-passin".into(),
            "pass:".into(),
        ];
        match self.toolchain.run(self.toolchain.openssl(), &args, &[]).await {
            Ok(output) => is_pkcs12_verdict(output.status, &output.stderr),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "PKCS#12 probe unavailable");
                false
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn classifier() -> Classifier {
        let toolchain = Toolchain::new(
            Some(PathBuf::from("/nonexistent/keytool")),
            Some(PathBuf::from("/nonexistent/openssl")),
            Duration::from_secs(5),
        );
        Classifier::new(Arc::new(toolchain))
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(
            StoreFormat::from_extension(Path::new("a/trust.JKS")),
            Some(StoreFormat::BinaryKeystore)
        );
        assert_eq!(
            StoreFormat::from_extension(Path::new("client.pfx")),
            Some(StoreFormat::Pkcs12Archive)
        );
        assert_eq!(
            StoreFormat::from_extension(Path::new("ca.cer")),
            Some(StoreFormat::PemBundle)
        );
        assert_eq!(StoreFormat::from_extension(Path::new("cacerts")), None);
    }

    #[test]
    fn test_requires_credential() {
        assert!(StoreFormat::BinaryKeystore.requires_credential());
        assert!(StoreFormat::Pkcs12Archive.requires_credential());
        assert!(!StoreFormat::PemBundle.requires_credential());
    }

    #[test]
    fn test_sniff_magic_and_pem() {
        assert_eq!(
            sniff(&[0xFE, 0xED, 0xFE, 0xED, 0, 0, 0, 2]),
            Some(StoreFormat::BinaryKeystore)
        );
        assert_eq!(sniff(&JCEKS_MAGIC), Some(StoreFormat::BinaryKeystore));

        let pem = rcgen::generate_simple_self_signed(vec!["sniff.example".to_string()])
            .unwrap()
            .cert
            .pem();
        assert_eq!(
            sniff(format!("\n\n{}", pem).as_bytes()),
            Some(StoreFormat::PemBundle)
        );

        // Armour without a complete certificate block is not a bundle.
        assert_eq!(sniff(b"-----BEGIN CERTIFICATE-----\nMIIB\n"), None);
        assert_eq!(sniff(b"plain text"), None);
    }

    #[test]
    fn test_pkcs12_verdict() {
        assert!(is_pkcs12_verdict(Some(0), ""));
        assert!(is_pkcs12_verdict(Some(1), "Mac verify error: invalid password?"));
        assert!(!is_pkcs12_verdict(Some(1), "Could not read PKCS12 file"));
        assert!(!is_pkcs12_verdict(Some(2), "Mac verify error"));
        assert!(!is_pkcs12_verdict(None, ""));
    }

    #[tokio::test]
    async fn test_classify_without_extension() {
        let dir = tempfile::tempdir().unwrap();

        let cacerts = dir.path().join("cacerts");
        std::fs::write(&cacerts, [0xFE, 0xED, 0xFE, 0xED, 0, 0, 0, 2]).unwrap();
        assert_eq!(
            classifier().classify(&cacerts).await.unwrap(),
            StoreFormat::BinaryKeystore
        );

        let blob = dir.path().join("blob.bin");
        std::fs::write(&blob, b"not a store").unwrap();
        assert_eq!(
            classifier().classify(&blob).await.unwrap(),
            StoreFormat::Unknown
        );

        // DER-looking content with no usable openssl stays unknown.
        let der = dir.path().join("maybe.der");
        std::fs::write(&der, [0x30, 0x82, 0x01, 0x00]).unwrap();
        assert_eq!(
            classifier().classify(&der).await.unwrap(),
            StoreFormat::Unknown
        );
    }
}
