// Trustward — Run configuration
//
// `ReconcileConfig` is the one value the core consumes. It is only built
// through `ReconcileConfigBuilder::build`, which validates it, so the rest of
// the crate never re-checks ranges. Password candidates are redacted from
// Debug output.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use super::ConfigError;
use crate::store::{Toolchain, DEFAULT_TOOL_TIMEOUT};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Common store passwords, tried in this order. The empty string is last.
pub const DEFAULT_PASSWORDS: &[&str] = &[
    "changeit",
    "changeme",
    "password",
    "keystore",
    "truststore",
    "secret",
    "",
];

/// Stores processed in parallel when not configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Upper bound on parallel stores: the permit limit of the worker semaphore.
pub const MAX_CONCURRENCY: usize = tokio::sync::Semaphore::MAX_PERMITS;

// ─── Types ───────────────────────────────────────────────────────────────────

/// Whether a run may touch the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Back up, mutate, verify, then commit or roll back.
    Apply,
    /// Plan the mutation and report it without performing it.
    DryRun,
    /// Report the baseline diff only; no mutation is planned.
    CompareOnly,
}

impl Mode {
    pub fn mutates(self) -> bool {
        self == Mode::Apply
    }
}

/// What happens to the snapshot taken before a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPolicy {
    pub enabled: bool,
    /// Directory for backups; next to the store when unset.
    pub dir: Option<PathBuf>,
    /// Keep the backup after a successful commit.
    pub retain: bool,
    /// Prune older backups of the same store after a commit.
    pub retention_days: Option<u32>,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            retain: false,
            retention_days: None,
        }
    }
}

#[derive(Clone)]
pub struct ReconcileConfig {
    pub mode: Mode,
    /// Password candidates in trial order, without duplicates.
    pub candidates: Vec<String>,
    pub backup: BackupPolicy,
    pub concurrency: usize,
    pub tool_timeout: Duration,
    pub keytool: Option<PathBuf>,
    pub openssl: Option<PathBuf>,
}

impl ReconcileConfig {
    pub fn builder() -> ReconcileConfigBuilder {
        ReconcileConfigBuilder::default()
    }

    /// Toolchain for this run: explicit paths, otherwise discovery.
    pub fn toolchain(&self) -> Toolchain {
        Toolchain::new(self.keytool.clone(), self.openssl.clone(), self.tool_timeout)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Apply,
            candidates: DEFAULT_PASSWORDS.iter().map(|s| s.to_string()).collect(),
            backup: BackupPolicy::default(),
            concurrency: DEFAULT_CONCURRENCY,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            keytool: None,
            openssl: None,
        }
    }
}

/// Debug output never includes candidate passwords.
impl fmt::Debug for ReconcileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconcileConfig")
            .field("mode", &self.mode)
            .field("candidates", &format_args!("[REDACTED; {}]", self.candidates.len()))
            .field("backup", &self.backup)
            .field("concurrency", &self.concurrency)
            .field("tool_timeout", &self.tool_timeout)
            .field("keytool", &self.keytool)
            .field("openssl", &self.openssl)
            .finish()
    }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct ReconcileConfigBuilder {
    mode: Option<Mode>,
    candidates: Option<Vec<String>>,
    backup: Option<BackupPolicy>,
    concurrency: Option<usize>,
    tool_timeout: Option<Duration>,
    keytool: Option<PathBuf>,
    openssl: Option<PathBuf>,
}

impl ReconcileConfigBuilder {
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Replace the default password list.
    pub fn candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = Some(candidates.into_iter().map(Into::into).collect());
        self
    }

    pub fn backup(mut self, policy: BackupPolicy) -> Self {
        self.backup = Some(policy);
        self
    }

    pub fn concurrency(mut self, workers: usize) -> Self {
        self.concurrency = Some(workers);
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn keytool(mut self, path: Option<PathBuf>) -> Self {
        self.keytool = path;
        self
    }

    pub fn openssl(mut self, path: Option<PathBuf>) -> Self {
        self.openssl = path;
        self
    }

    pub fn build(self) -> Result<ReconcileConfig, ConfigError> {
        let defaults = ReconcileConfig::default();

        let concurrency = self.concurrency.unwrap_or(defaults.concurrency);
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::InvalidConcurrency);
        }

        let tool_timeout = self.tool_timeout.unwrap_or(defaults.tool_timeout);
        if tool_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }

        let candidates = match self.candidates {
            Some(list) => dedupe(list),
            None => defaults.candidates,
        };
        if candidates.is_empty() {
            return Err(ConfigError::NoCandidates);
        }

        let backup = self.backup.unwrap_or(defaults.backup);
        if backup.retention_days == Some(0) {
            return Err(ConfigError::InvalidRetention);
        }

        Ok(ReconcileConfig {
            mode: self.mode.unwrap_or(defaults.mode),
            candidates,
            backup,
            concurrency,
            tool_timeout,
            keytool: self.keytool,
            openssl: self.openssl,
        })
    }
}

/// Drop repeated values, keeping the first occurrence of each.
fn dedupe(list: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(list.len());
    for value in list {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────────
