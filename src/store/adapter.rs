// Trustward — Store adapter contract
//
// One implementation per on-disk format. The coordinator and the differ only
// ever see this trait; which tool (if any) sits behind it is the adapter's
// business.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::NamedTempFile;

use super::{
    Credential, KeytoolAdapter, OpensslAdapter, PemBundleAdapter, StoreError, StoreFormat,
    Toolchain,
};
use crate::certificate::{Certificate, CertificateSet, Fingerprint};

/// Result of adding one certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Written under a freshly generated label.
    Added { label: String },
    /// The fingerprint was already in the store; nothing was written.
    AlreadyPresent,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Uniform access to a trust store of one format.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    fn format(&self) -> StoreFormat;

    /// Every certificate in the store.
    async fn list(&self, path: &Path, credential: &Credential) -> Result<CertificateSet, StoreError>;

    /// Add `cert` unless its fingerprint is already present.
    async fn add_certificate(
        &self,
        path: &Path,
        credential: &Credential,
        cert: &Certificate,
    ) -> Result<AddOutcome, StoreError>;

    /// Re-read the store and confirm it opens cleanly and holds every
    /// `expected` fingerprint.
    async fn verify(
        &self,
        path: &Path,
        credential: &Credential,
        expected: &[Fingerprint],
    ) -> Result<bool, StoreError> {
        let set = self.list(path, credential).await?;
        Ok(expected.iter().all(|fp| set.contains(fp)))
    }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Maps each format to the adapter that handles it.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<StoreFormat, Arc<dyn StoreAdapter>>,
}

impl AdapterRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// keytool, openssl and plain-text adapters sharing one toolchain.
    pub fn standard(toolchain: Arc<Toolchain>) -> Self {
        Self::empty()
            .with_adapter(Arc::new(KeytoolAdapter::new(Arc::clone(&toolchain))))
            .with_adapter(Arc::new(OpensslAdapter::new(toolchain)))
            .with_adapter(Arc::new(PemBundleAdapter::new()))
    }

    /// Register `adapter` for its format, replacing any previous one.
    pub fn with_adapter(mut self, adapter: Arc<dyn StoreAdapter>) -> Self {
        self.adapters.insert(adapter.format(), adapter);
        self
    }

    pub fn adapter_for(&self, format: StoreFormat) -> Option<Arc<dyn StoreAdapter>> {
        self.adapters.get(&format).cloned()
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Label for a newly added entry: unique per second and certificate.
pub fn generate_label(fingerprint: &Fingerprint) -> String {
    format!("trustward-{}-{}", Utc::now().timestamp(), fingerprint.short())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Empty temporary file next to `path`, so a later rename stays on one
/// filesystem.
pub(crate) fn sibling_temp(path: &Path) -> io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(".trustward-")
        .suffix(".tmp")
        .tempfile_in(parent_dir(path))
}

/// Move a finished temporary file over `path`, keeping the original
/// permissions.
pub(crate) fn persist_over(tmp: NamedTempFile, path: &Path) -> io::Result<()> {
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Run blocking filesystem work on tokio's blocking pool.
pub(crate) async fn blocking_io<T, E, F>(work: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    E: Into<StoreError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(work).await.map_err(io::Error::other)?;
    result.map_err(Into::into)
}

/// Replace the content of `path` in one rename: readers see either the old
/// bytes or the new ones.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = sibling_temp(path)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    persist_over(tmp, path)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_generate_label_shape() {
        let fp = Fingerprint::of(b"label");
        let label = generate_label(&fp);
        assert!(label.starts_with("trustward-"));
        assert!(label.ends_with(&fp.short()));
        assert_eq!(label.split('-').count(), 3);
    }

    #[test]
    fn test_write_atomic_replaces_content_and_keeps_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.pem");
        fs::write(&path, b"old").unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();
        }

        write_atomic(&path, b"new content").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new content");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o640);
        }

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".trustward-"))
            .collect();
        assert!(leftovers.is_empty(), "temporary files must not be left behind");
    }

    #[tokio::test]
    async fn test_blocking_io_runs_off_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.pem");
        let target = path.clone();
        blocking_io(move || write_atomic(&target, b"from pool")).await.unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"from pool");

        let missing = dir.path().join("missing.pem");
        let result = blocking_io(move || fs::read(&missing)).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn test_registry_lookup() {
        let toolchain = Arc::new(Toolchain::new(None, None, Duration::from_secs(5)));
        let registry = AdapterRegistry::standard(toolchain);
        for format in [
            StoreFormat::BinaryKeystore,
            StoreFormat::Pkcs12Archive,
            StoreFormat::PemBundle,
        ] {
            let adapter = registry.adapter_for(format).unwrap();
            assert_eq!(adapter.format(), format);
        }
        assert!(registry.adapter_for(StoreFormat::Unknown).is_none());
    }
}
