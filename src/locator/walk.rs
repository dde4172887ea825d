// Trustward — Directory walk
//
// One pass over the tree collects both store files (by suffix) and the text
// sources worth mining for references. Unreadable entries are logged and
// skipped; discovery never aborts on a single bad file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::{LocatorError, Provenance, ReferenceMiner, TrustStorePath};

/// Directory names never descended into (hidden directories are skipped too).
pub const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "bower_components",
    "__pycache__",
    "venv",
];

/// Store file suffixes, lowercase, without the dot.
const STORE_SUFFIXES: &[&str] = &[
    "jks",
    "keystore",
    "truststore",
    "p12",
    "pfx",
    "pem",
    "crt",
    "cer",
    "cert",
];

/// Text sources larger than this are not mined.
const MAX_MINED_BYTES: u64 = 4 * 1024 * 1024;

/// Whether a file name looks like a trust store.
pub fn is_store_file_name(file_name: &str) -> bool {
    let name = file_name.to_ascii_lowercase();
    if name == "cacerts" {
        return true;
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) => !stem.is_empty() && STORE_SUFFIXES.contains(&ext),
        None => false,
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

/// Discovers trust stores under a root directory.
pub struct Locator {
    miner: ReferenceMiner,
    max_mined_bytes: u64,
}

impl Locator {
    pub fn new() -> Result<Self, LocatorError> {
        Ok(Self {
            miner: ReferenceMiner::new()?,
            max_mined_bytes: MAX_MINED_BYTES,
        })
    }

    /// Walk `root` and return every existing store, deduplicated by
    /// canonical path and sorted by it.
    pub fn discover(&self, root: &Path) -> Result<Vec<TrustStorePath>, LocatorError> {
        if !root.is_dir() {
            return Err(LocatorError::RootNotFound(root.to_path_buf()));
        }
        let root = fs::canonicalize(root)?;
        tracing::info!(root = %root.display(), "Scanning for trust stores");

        let mut by_extension: Vec<PathBuf> = Vec::new();
        let mut by_reference: Vec<(PathBuf, PathBuf)> = Vec::new();

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if is_store_file_name(&name) {
                by_extension.push(entry.path().to_path_buf());
            }
            if self.miner.is_source(&name) {
                for target in self.mine(entry.path()) {
                    by_reference.push((target, entry.path().to_path_buf()));
                }
            }
        }

        let mut stores: BTreeMap<PathBuf, TrustStorePath> = BTreeMap::new();

        for path in by_extension {
            if let Some(canonical) = canonical_file(&path) {
                stores
                    .entry(canonical.clone())
                    .or_insert_with(|| TrustStorePath::new(canonical, Provenance::Extension));
            }
        }

        for (target, source) in by_reference {
            let Some(canonical) = canonical_file(&target) else {
                tracing::debug!(
                    target = %target.display(),
                    source = %source.display(),
                    "Referenced store does not exist"
                );
                continue;
            };
            stores
                .entry(canonical.clone())
                .or_insert_with(|| {
                    TrustStorePath::new(
                        canonical,
                        Provenance::Reference {
                            source: source.clone(),
                        },
                    )
                })
                .add_reference(source);
        }

        tracing::info!(count = stores.len(), "Discovery finished");
        Ok(stores.into_values().collect())
    }

    /// Read one text source and extract referenced paths. Any failure is
    /// logged and yields nothing.
    fn mine(&self, file: &Path) -> Vec<PathBuf> {
        match fs::metadata(file) {
            Ok(meta) if meta.len() > self.max_mined_bytes => {
                tracing::debug!(file = %file.display(), bytes = meta.len(), "Source too large to mine");
                return Vec::new();
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Cannot stat source file");
                return Vec::new();
            }
        }

        match fs::read_to_string(file) {
            Ok(content) => self.miner.extract(file, &content),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::debug!(file = %file.display(), "Source is not UTF-8, skipping");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Cannot read source file");
                Vec::new()
            }
        }
    }
}

/// Canonical path of an existing regular file.
fn canonical_file(path: &Path) -> Option<PathBuf> {
    let canonical = fs::canonicalize(path).ok()?;
    if canonical.is_file() {
        Some(canonical)
    } else {
        None
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_store_file_names() {
        assert!(is_store_file_name("cacerts"));
        assert!(is_store_file_name("server.JKS"));
        assert!(is_store_file_name("bundle.pem"));
        assert!(is_store_file_name("client.p12"));
        assert!(!is_store_file_name("notes.txt"));
        assert!(!is_store_file_name(".pem"));
        assert!(!is_store_file_name("pem"));
    }

    #[test]
    fn test_discover_by_extension_skips_vcs_and_deps() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("certs/ca.pem"), "x");
        touch(&root.join("java/cacerts"), "x");
        touch(&root.join(".git/objects/leak.pem"), "x");
        touch(&root.join("node_modules/pkg/test.pem"), "x");
        touch(&root.join("readme.md"), "x");

        let found = Locator::new().unwrap().discover(root).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|s| s.path().strip_prefix(fs::canonicalize(root).unwrap()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            names,
            vec![PathBuf::from("certs/ca.pem"), PathBuf::from("java/cacerts")]
        );
        assert!(found.iter().all(|s| *s.provenance() == Provenance::Extension));
    }

    #[test]
    fn test_discover_merges_references_and_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("stores/app.truststore"), "x");
        touch(&root.join("shared/java-trust"), "x");
        // Same store named two ways, plus one path with no extension.
        touch(
            &root.join("svc/config/app.properties"),
            "javax.net.ssl.trustStore=../../stores/app.truststore\n\
             server.ssl.trust-store=../../shared/java-trust\n\
             other.truststore=missing.jks\n",
        );

        let found = Locator::new().unwrap().discover(root).unwrap();
        assert_eq!(found.len(), 2);

        let canonical_root = fs::canonicalize(root).unwrap();
        let ext = found
            .iter()
            .find(|s| s.path().ends_with("app.truststore"))
            .unwrap();
        assert_eq!(*ext.provenance(), Provenance::Extension);
        assert_eq!(
            ext.referenced_by(),
            [canonical_root.join("svc/config/app.properties")]
        );

        let referenced = found
            .iter()
            .find(|s| s.path().ends_with("java-trust"))
            .unwrap();
        assert!(matches!(referenced.provenance(), Provenance::Reference { .. }));
    }

    #[test]
    fn test_discover_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Locator::new().unwrap().discover(&dir.path().join("nope"));
        assert!(matches!(result, Err(LocatorError::RootNotFound(_))));
    }

    #[test]
    fn test_discover_skips_non_utf8_sources() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("binary.properties"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        touch(&root.join("ok.pem"), "x");

        let found = Locator::new().unwrap().discover(root).unwrap();
        assert_eq!(found.len(), 1);
    }
}
