// Trustward — Store backups
//
// A backup is a byte-for-byte copy of one store, named from the store's file
// name plus the time it was taken: `<name>.bak.<YYYYmmdd_HHMMSS>`, with a
// `.N` suffix on collision. Backups in a shared directory also carry a short
// digest of the store's directory so equal file names never mix.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

use super::BackupPolicy;
use crate::certificate::Fingerprint;
use crate::store::{write_atomic, StoreError};

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const STAMP_LEN: usize = 15;
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Snapshot of one store, owned by the coordinator handling that store.
#[derive(Debug, Clone)]
pub struct Backup {
    original: PathBuf,
    path: PathBuf,
}

impl Backup {
    pub fn take(store: &Path, policy: &BackupPolicy) -> Result<Self, StoreError> {
        let taken_at = Utc::now();
        let dir = backup_dir(store, policy);
        if policy.dir.is_some() {
            fs::create_dir_all(&dir).map_err(|e| backup_error("create backup directory", &dir, e))?;
        }

        let bytes = fs::read(store).map_err(|e| backup_error("read store", store, e))?;
        let base = format!("{}.{}", base_name(store, policy)?, taken_at.format(STAMP_FORMAT));

        for i in 0..MAX_NAME_ATTEMPTS {
            let name = if i == 0 {
                base.clone()
            } else {
                format!("{}.{}", base, i)
            };
            let candidate = dir.join(name);

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(backup_error("create backup", &candidate, e)),
            };

            let written = file
                .write_all(&bytes)
                .and_then(|_| file.sync_all())
                .and_then(|_| fs::metadata(store))
                .and_then(|meta| fs::set_permissions(&candidate, meta.permissions()));
            if let Err(e) = written {
                let _ = fs::remove_file(&candidate);
                return Err(backup_error("write backup", &candidate, e));
            }

            tracing::debug!(store = %store.display(), backup = %candidate.display(), "Backup taken");
            return Ok(Self {
                original: store.to_path_buf(),
                path: candidate,
            });
        }

        Err(StoreError::Backup(format!(
            "no free backup name for {}",
            store.display()
        )))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Put the snapshot bytes back over the store in one rename.
    pub fn restore(&self) -> Result<(), StoreError> {
        let bytes = fs::read(&self.path).map_err(|e| backup_error("read backup", &self.path, e))?;
        write_atomic(&self.original, &bytes).map_err(|e| backup_error("restore store", &self.original, e))?;
        tracing::debug!(store = %self.original.display(), "Store restored from backup");
        Ok(())
    }

    /// Delete the snapshot.
    pub fn discard(self) -> Result<(), StoreError> {
        fs::remove_file(&self.path).map_err(|e| backup_error("remove backup", &self.path, e))
    }
}

fn backup_error(action: &str, path: &Path, e: io::Error) -> StoreError {
    StoreError::Backup(format!("{} {}: {}", action, path.display(), e))
}

fn backup_dir(store: &Path, policy: &BackupPolicy) -> PathBuf {
    match &policy.dir {
        Some(dir) => dir.clone(),
        None => match store.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        },
    }
}

/// `<file>.bak`, or `<file>.<dir-digest>.bak` in a shared backup directory.
fn base_name(store: &Path, policy: &BackupPolicy) -> Result<String, StoreError> {
    let file_name = store
        .file_name()
        .ok_or_else(|| StoreError::Backup(format!("{} has no file name", store.display())))?
        .to_string_lossy()
        .into_owned();

    Ok(match (&policy.dir, store.parent()) {
        (Some(_), Some(parent)) => {
            let digest = Fingerprint::of(parent.to_string_lossy().as_bytes());
            format!("{}.{}.bak", file_name, digest.short())
        }
        _ => format!("{}.bak", file_name),
    })
}

/// Delete backups of `store` older than the retention window, except `keep`.
/// Returns the removed paths.
pub fn prune_expired(
    store: &Path,
    policy: &BackupPolicy,
    keep: Option<&Path>,
    now: DateTime<Utc>,
) -> Result<Vec<PathBuf>, StoreError> {
    let Some(days) = policy.retention_days else {
        return Ok(Vec::new());
    };
    // A window reaching before the earliest representable time expires nothing.
    let cutoff = Duration::try_days(i64::from(days)).and_then(|window| now.checked_sub_signed(window));
    let Some(cutoff) = cutoff else {
        tracing::debug!(store = %store.display(), days, "Retention window exceeds the calendar, nothing to prune");
        return Ok(Vec::new());
    };
    let prefix = format!("{}.", base_name(store, policy)?);
    let dir = backup_dir(store, policy);

    let entries = fs::read_dir(&dir).map_err(|e| backup_error("list backups in", &dir, e))?;
    let mut removed = Vec::new();

    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if Some(path.as_path()) == keep {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(taken_at) = name.strip_prefix(&prefix).and_then(parse_stamp) else {
            continue;
        };
        if taken_at < cutoff {
            match fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(e) => tracing::warn!(backup = %path.display(), error = %e, "Could not prune backup"),
            }
        }
    }

    if !removed.is_empty() {
        tracing::info!(store = %store.display(), pruned = removed.len(), "Pruned expired backups");
    }
    Ok(removed)
}

fn parse_stamp(suffix: &str) -> Option<DateTime<Utc>> {
    let stamp = suffix.get(..STAMP_LEN)?;
    let naive = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path, content: &[u8]) -> PathBuf {
        let path = dir.join("trust.pem");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_take_and_restore_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let original = b"-----BEGIN CERTIFICATE-----\noriginal\n".to_vec();
        let store = store_in(dir.path(), &original);

        let backup = Backup::take(&store, &BackupPolicy::default()).unwrap();
        let name = backup.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("trust.pem.bak."));
        assert_eq!(backup.path().parent(), store.parent());

        fs::write(&store, b"damaged").unwrap();
        backup.restore().unwrap();
        assert_eq!(fs::read(&store).unwrap(), original);

        let path = backup.path().to_path_buf();
        backup.discard().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_names_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), b"x");

        let first = Backup::take(&store, &BackupPolicy::default()).unwrap();
        let second = Backup::take(&store, &BackupPolicy::default()).unwrap();
        assert_ne!(first.path(), second.path());
        assert!(first.path().exists() && second.path().exists());
    }

    #[test]
    fn test_shared_dir_names_include_directory_digest() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), b"x");
        let policy = BackupPolicy {
            dir: Some(dir.path().join("backups")),
            ..BackupPolicy::default()
        };

        let backup = Backup::take(&store, &policy).unwrap();
        assert_eq!(backup.path().parent(), Some(dir.path().join("backups").as_path()));
        let name = backup.path().file_name().unwrap().to_string_lossy().into_owned();
        let digest = Fingerprint::of(dir.path().to_string_lossy().as_bytes()).short();
        assert!(name.starts_with(&format!("trust.pem.{}.bak.", digest)));
    }

    #[test]
    fn test_prune_removes_only_expired_backups_of_this_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), b"x");
        let old = dir.path().join("trust.pem.bak.20000101_000000");
        let old_collision = dir.path().join("trust.pem.bak.20000101_000000.1");
        let other_store = dir.path().join("other.pem.bak.20000101_000000");
        for path in [&old, &old_collision, &other_store] {
            fs::write(path, b"x").unwrap();
        }
        let current = Backup::take(&store, &BackupPolicy::default()).unwrap();

        let policy = BackupPolicy {
            retention_days: Some(30),
            ..BackupPolicy::default()
        };
        let mut removed = prune_expired(&store, &policy, Some(current.path()), Utc::now()).unwrap();
        removed.sort();

        assert_eq!(removed, vec![old.clone(), old_collision.clone()]);
        assert!(current.path().exists());
        assert!(other_store.exists());
    }

    #[test]
    fn test_prune_with_huge_retention_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), b"x");
        let old = dir.path().join("trust.pem.bak.20000101_000000");
        fs::write(&old, b"x").unwrap();
        let policy = BackupPolicy {
            retention_days: Some(u32::MAX),
            ..BackupPolicy::default()
        };

        let removed = prune_expired(&store, &policy, None, Utc::now()).unwrap();
        assert!(removed.is_empty());
        assert!(old.exists());
    }

    #[test]
    fn test_prune_without_retention_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), b"x");
        fs::write(dir.path().join("trust.pem.bak.20000101_000000"), b"x").unwrap();

        let removed = prune_expired(&store, &BackupPolicy::default(), None, Utc::now()).unwrap();
        assert!(removed.is_empty());
    }

    #[test]
    fn test_parse_stamp() {
        let parsed = parse_stamp("20240305_101112.3").unwrap();
        assert_eq!(parsed.format(STAMP_FORMAT).to_string(), "20240305_101112");
        assert!(parse_stamp("garbage").is_none());
    }
}
