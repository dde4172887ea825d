// Trustward — Mutation coordinator
//
// Drives one store through Idle -> BackedUp -> Applied -> Committed, or
// RolledBack when applying or verifying fails. Dry-run and compare-only stop
// at the entry point, before any snapshot is taken, so no adapter ever sees
// a mutation request in those modes.
//
// Every per-store error ends here as a record; nothing propagates further.

use std::path::Path;

use super::backup::{prune_expired, Backup};
use super::{Mode, ModificationRecord, Operation, ReconcileConfig, Status};
use crate::baseline::diff;
use crate::certificate::{Certificate, CertificateSet, Fingerprint};
use crate::locator::TrustStorePath;
use crate::store::{blocking_io, AddOutcome, Probed, StoreAdapter, StoreError};

/// What a store should end up containing.
#[derive(Debug, Clone, Copy)]
pub enum Plan<'a> {
    /// Single-certificate mode.
    Append(&'a Certificate),
    /// Baseline mode.
    Sync(&'a CertificateSet),
}

impl Plan<'_> {
    pub fn operation(&self, mode: Mode) -> Operation {
        match (self, mode) {
            (Plan::Append(_), _) => Operation::Append,
            (Plan::Sync(_), Mode::CompareOnly) => Operation::Compare,
            (Plan::Sync(_), _) => Operation::Sync,
        }
    }
}

pub struct MutationCoordinator<'a> {
    adapter: &'a dyn StoreAdapter,
    config: &'a ReconcileConfig,
}

impl<'a> MutationCoordinator<'a> {
    pub fn new(adapter: &'a dyn StoreAdapter, config: &'a ReconcileConfig) -> Self {
        Self { adapter, config }
    }

    /// Reconcile one opened store with `plan`.
    pub async fn reconcile(&self, store: &TrustStorePath, probed: Probed, plan: Plan<'_>) -> ModificationRecord {
        let path = store.path();
        let mut record = ModificationRecord::new(
            store,
            self.adapter.format(),
            plan.operation(self.config.mode),
            self.config.mode,
        );

        record.warnings = probed.certificates.duplicate_warnings();
        for warning in &record.warnings {
            tracing::warn!(path = %path.display(), "{}", warning);
        }

        let to_add: Vec<Certificate> = match plan {
            Plan::Append(cert) if probed.certificates.contains(cert.fingerprint()) => Vec::new(),
            Plan::Append(cert) => vec![cert.clone()],
            Plan::Sync(baseline) => {
                let delta = diff(&probed.certificates, baseline);
                record.extra = delta.extra.iter().map(|c| *c.fingerprint()).collect();
                delta.missing.into_iter().cloned().collect()
            }
        };
        record.missing = fingerprints(&to_add);

        let digest_before = match file_digest(path).await {
            Ok(digest) => digest,
            Err(e) => return record.fail(Status::Failed, &e),
        };
        record.digest_before = Some(digest_before);
        record.digest_after = Some(digest_before);

        if !self.config.mode.mutates() {
            if self.config.mode == Mode::DryRun {
                record.planned = record.missing.clone();
                tracing::info!(path = %path.display(), planned = record.planned.len(), "Dry run, store untouched");
            } else {
                tracing::info!(
                    path = %path.display(),
                    missing = record.missing.len(),
                    extra = record.extra.len(),
                    "Compared with baseline"
                );
            }
            return record;
        }

        if to_add.is_empty() {
            tracing::info!(path = %path.display(), "Already reconciled");
            return record;
        }

        // Idle -> BackedUp
        let backup = if self.config.backup.enabled {
            let (store_path, policy) = (path.to_path_buf(), self.config.backup.clone());
            match blocking_io(move || Backup::take(&store_path, &policy)).await {
                Ok(backup) => Some(backup),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Backup failed, store left untouched");
                    return record.fail(Status::Failed, &e);
                }
            }
        } else {
            tracing::warn!(path = %path.display(), "Backups disabled, mutation is not recoverable");
            record.recoverable = false;
            None
        };

        // BackedUp -> Applied
        for cert in &to_add {
            match self.adapter.add_certificate(path, &probed.credential, cert).await {
                Ok(AddOutcome::Added { label }) => {
                    tracing::info!(path = %path.display(), label = %label, certificate = %cert, "Certificate added");
                    record.added.push(*cert.fingerprint());
                }
                Ok(AddOutcome::AlreadyPresent) => {
                    tracing::debug!(path = %path.display(), certificate = %cert, "Certificate already present");
                }
                Err(e) => return self.roll_back(record, backup, e).await,
            }
        }

        // Applied -> Verified
        let expected = fingerprints(&to_add);
        let verified = match self.adapter.verify(path, &probed.credential, &expected).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(StoreError::Verification(
                "expected certificates are missing after apply".into(),
            )),
            Err(e) => Err(StoreError::Verification(e.to_string())),
        };
        if let Err(e) = verified {
            return self.roll_back(record, backup, e).await;
        }

        // Committed
        record.status = if record.added.is_empty() {
            Status::Noop
        } else {
            Status::Success
        };
        record.digest_after = file_digest(path).await.ok();
        if let Some(backup) = backup {
            self.settle_backup(&mut record, backup).await;
        }
        tracing::info!(path = %path.display(), added = record.added.len(), "Store committed");
        record
    }

    /// Restore the snapshot after a failed apply or verify.
    async fn roll_back(&self, mut record: ModificationRecord, backup: Option<Backup>, error: StoreError) -> ModificationRecord {
        let path = record.path.clone();

        let Some(backup) = backup else {
            tracing::error!(path = %path.display(), error = %error, "Mutation failed without a backup; store may be modified");
            record.recoverable = false;
            record.digest_after = file_digest(&path).await.ok();
            return record.fail(Status::Failed, &error);
        };

        let snapshot = backup.clone();
        match blocking_io(move || snapshot.restore()).await {
            Ok(()) => {
                tracing::warn!(path = %path.display(), error = %error, "Mutation failed, store rolled back");
                record.added.clear();
                record.digest_after = file_digest(&path).await.ok();
                if self.config.backup.retain {
                    record.backup_path = Some(backup.path().to_path_buf());
                } else if let Err(e) = blocking_io(move || backup.discard()).await {
                    tracing::warn!(path = %path.display(), error = %e, "Could not remove backup");
                }
                record.fail(Status::RolledBack, &error)
            }
            Err(restore_error) => {
                tracing::error!(
                    path = %path.display(),
                    backup = %backup.path().display(),
                    error = %restore_error,
                    "Rollback failed; restore the store from its backup by hand"
                );
                record.backup_path = Some(backup.path().to_path_buf());
                record.digest_after = file_digest(&path).await.ok();
                let mut record = record.fail(Status::Failed, &error);
                record.error = Some(format!("{}; rollback failed: {}", error, restore_error));
                record
            }
        }
    }

    /// Keep or delete the snapshot after a commit, then prune old ones.
    async fn settle_backup(&self, record: &mut ModificationRecord, backup: Backup) {
        let policy = self.config.backup.clone();
        let keep = if policy.retain {
            record.backup_path = Some(backup.path().to_path_buf());
            Some(backup.path().to_path_buf())
        } else {
            if let Err(e) = blocking_io(move || backup.discard()).await {
                tracing::warn!(path = %record.path.display(), error = %e, "Could not remove backup");
            }
            None
        };

        let store = record.path.clone();
        let pruned =
            blocking_io(move || prune_expired(&store, &policy, keep.as_deref(), chrono::Utc::now())).await;
        if let Err(e) = pruned {
            tracing::warn!(path = %record.path.display(), error = %e, "Could not prune backups");
        }
    }
}

fn fingerprints(certs: &[Certificate]) -> Vec<Fingerprint> {
    certs.iter().map(|c| *c.fingerprint()).collect()
}

/// SHA-256 of the store file as it is on disk now.
async fn file_digest(path: &Path) -> Result<Fingerprint, StoreError> {
    Ok(Fingerprint::of(&tokio::fs::read(path).await?))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
