// Trustward — Credential prober
//
// Candidates are tried strictly in order, each at most once, and probing
// stops at the first one whose listing succeeds. Candidate values are never
// logged, only how many were tried.

use std::collections::HashSet;
use std::path::Path;

use super::{Credential, StoreAdapter, StoreError};
use crate::certificate::CertificateSet;

/// An opened store: the credential that worked and what it revealed.
#[derive(Debug)]
pub struct Probed {
    pub credential: Credential,
    pub certificates: CertificateSet,
    /// Distinct candidates attempted, including the successful one.
    pub tried: usize,
}

/// Find the credential that opens `path`. Formats without a credential are
/// listed once with `Credential::none()`.
pub async fn probe(
    adapter: &dyn StoreAdapter,
    path: &Path,
    candidates: &[String],
) -> Result<Probed, StoreError> {
    if !adapter.format().requires_credential() {
        let certificates = adapter.list(path, &Credential::none()).await?;
        return Ok(Probed {
            credential: Credential::none(),
            certificates,
            tried: 0,
        });
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(candidates.len());
    let mut tried = 0;

    for candidate in candidates {
        if !seen.insert(candidate.as_str()) {
            continue;
        }
        tried += 1;

        let credential = Credential::new(candidate.as_str());
        match adapter.list(path, &credential).await {
            Ok(certificates) => {
                tracing::debug!(path = %path.display(), tried, "Store opened");
                return Ok(Probed {
                    credential,
                    certificates,
                    tried,
                });
            }
            // No other candidate can do better when the tool itself is missing or hung.
            Err(e @ (StoreError::ToolUnavailable { .. } | StoreError::Timeout { .. })) => return Err(e),
            Err(_) => continue,
        }
    }

    tracing::warn!(path = %path.display(), tried, "No candidate credential opened the store");
    Err(StoreError::CredentialExhausted { tried })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::super::mock::{self_signed, MockKeystore};
    use super::super::{PemBundleAdapter, StoreFormat};
    use super::*;

    fn candidates(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_probe_stops_at_first_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trust.p12");
        MockKeystore::create(&path, "y", &[self_signed("probe.example")]).unwrap();

        let adapter = MockKeystore::new(StoreFormat::Pkcs12Archive);
        let probed = probe(&adapter, &path, &candidates(&["x", "y", "z"]))
            .await
            .unwrap();

        assert_eq!(probed.credential.expose(), Some("y"));
        assert_eq!(probed.tried, 2);
        assert_eq!(probed.certificates.len(), 1);
        assert_eq!(adapter.attempts(), vec!["x", "y"], "\"z\" must never be tried");
    }

    #[tokio::test]
    async fn test_probe_never_repeats_a_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trust.jks");
        MockKeystore::create(&path, "right", &[]).unwrap();

        let adapter = MockKeystore::new(StoreFormat::BinaryKeystore);
        let result = probe(&adapter, &path, &candidates(&["a", "a", "b", "", "b"])).await;

        assert!(matches!(result, Err(StoreError::CredentialExhausted { tried: 3 })));
        assert_eq!(adapter.attempts(), vec!["a", "b", ""]);
    }

    #[tokio::test]
    async fn test_empty_password_is_a_real_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("open.p12");
        MockKeystore::create(&path, "", &[]).unwrap();

        let adapter = MockKeystore::new(StoreFormat::Pkcs12Archive);
        let probed = probe(&adapter, &path, &candidates(&["changeit", ""]))
            .await
            .unwrap();
        assert_eq!(probed.credential.expose(), Some(""));
    }

    #[tokio::test]
    async fn test_pem_skips_probing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.pem");
        std::fs::write(&path, self_signed("pem.example").to_pem()).unwrap();

        let probed = probe(&PemBundleAdapter::new(), &path, &[]).await.unwrap();
        assert!(probed.credential.is_none());
        assert_eq!(probed.tried, 0);
        assert_eq!(probed.certificates.len(), 1);
    }
}
