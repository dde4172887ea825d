// Trustward — Run records
//
// One `ModificationRecord` per store, accumulated by the driver and handed
// back as a `RunReport`. The summary is derived from the records, never
// counted on the side.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Mode;
use crate::certificate::Fingerprint;
use crate::locator::{Provenance, TrustStorePath};
use crate::store::{ErrorKind, StoreError, StoreFormat};

/// Final state of one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Nothing changed on disk (already reconciled, dry-run, compare-only).
    Noop,
    /// Mutation committed and verified.
    Success,
    /// The store could not be processed or the mutation could not be undone.
    Failed,
    /// A mutation was attempted and the original bytes were restored.
    RolledBack,
    /// Format unknown; reported as a warning.
    Skipped,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Noop => "noop",
            Status::Success => "success",
            Status::Failed => "failed",
            Status::RolledBack => "rolled_back",
            Status::Skipped => "skipped",
        };
        f.pad(name)
    }
}

/// What the run tried to do to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Add one explicit certificate.
    Append,
    /// Add every baseline certificate the store lacks.
    Sync,
    /// Report the baseline diff only.
    Compare,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Append => "append",
            Operation::Sync => "sync",
            Operation::Compare => "compare",
        };
        f.pad(name)
    }
}

/// Audit-facing outcome for one store.
#[derive(Debug, Clone, Serialize)]
pub struct ModificationRecord {
    pub path: PathBuf,
    pub provenance: Provenance,
    pub format: StoreFormat,
    pub operation: Operation,
    pub mode: Mode,
    pub status: Status,
    /// Certificates written to the store.
    pub added: Vec<Fingerprint>,
    /// Certificates a dry run would have written.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<Fingerprint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<Fingerprint>,
    /// In the store but not in the baseline. Never removed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<Fingerprint>,
    /// SHA-256 of the store file before and after the run.
    pub digest_before: Option<Fingerprint>,
    pub digest_after: Option<Fingerprint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub backup_path: Option<PathBuf>,
    /// False when the store was mutated without a backup.
    pub recoverable: bool,
    pub error_kind: Option<ErrorKind>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ModificationRecord {
    pub fn new(store: &TrustStorePath, format: StoreFormat, operation: Operation, mode: Mode) -> Self {
        Self {
            path: store.path().to_path_buf(),
            provenance: store.provenance().clone(),
            format,
            operation,
            mode,
            status: Status::Noop,
            added: Vec::new(),
            planned: Vec::new(),
            missing: Vec::new(),
            extra: Vec::new(),
            digest_before: None,
            digest_after: None,
            warnings: Vec::new(),
            backup_path: None,
            recoverable: true,
            error_kind: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Close the record with `status` and the error that caused it.
    pub fn fail(mut self, status: Status, error: &StoreError) -> Self {
        self.status = status;
        self.error_kind = Some(error.kind());
        self.error = Some(error.to_string());
        self
    }
}

/// Run-level counts, derived from the records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub found: usize,
    pub succeeded: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub rolled_back: usize,
    pub skipped_unknown: usize,
}

impl RunSummary {
    pub fn from_records(records: &[ModificationRecord]) -> Self {
        let mut summary = RunSummary {
            found: records.len(),
            ..RunSummary::default()
        };
        for record in records {
            match record.status {
                Status::Success => summary.succeeded += 1,
                Status::Noop => summary.unchanged += 1,
                Status::Failed => summary.failed += 1,
                Status::RolledBack => summary.rolled_back += 1,
                Status::Skipped => summary.skipped_unknown += 1,
            }
        }
        summary
    }
}

/// Everything a run produced, records sorted by path.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub records: Vec<ModificationRecord>,
    pub summary: RunSummary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn new(mut records: Vec<ModificationRecord>, started_at: DateTime<Utc>) -> Self {
        records.sort_by(|a, b| a.path.cmp(&b.path));
        let summary = RunSummary::from_records(&records);
        Self {
            records,
            summary,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// 0 when no store failed or had to be rolled back, 1 otherwise.
    /// Unknown formats are warnings and do not count.
    pub fn exit_code(&self) -> i32 {
        if self.summary.failed + self.summary.rolled_back == 0 {
            0
        } else {
            1
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
