// Trustward — Reconciliation
//
// Brings discovered stores to a desired state. Each mutation is bracketed by
// a backup, a post-write verification and either a commit or a byte-for-byte
// rollback.

mod backup;
mod config;
mod coordinator;
mod driver;
mod error;
mod models;

pub use backup::{prune_expired, Backup};
pub use config::{
    BackupPolicy, Mode, ReconcileConfig, ReconcileConfigBuilder, DEFAULT_CONCURRENCY,
    DEFAULT_PASSWORDS, MAX_CONCURRENCY,
};
pub use coordinator::{MutationCoordinator, Plan};
pub use driver::{Driver, ScanEntry, Target};
pub use error::ConfigError;
pub use models::{ModificationRecord, Operation, RunReport, RunSummary, Status};
