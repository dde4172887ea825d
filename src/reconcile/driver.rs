// Trustward — Reconciliation driver
//
// Discovers stores, then runs classify -> probe -> reconcile for each one on
// a bounded pool of tasks. A store's failure becomes that store's record and
// never stops the others. At most one task ever owns a given store path,
// since discovery deduplicates by canonical path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::coordinator::{MutationCoordinator, Plan};
use super::{ModificationRecord, ReconcileConfig, RunReport, Status};
use crate::baseline::Baseline;
use crate::certificate::Certificate;
use crate::error::{Result, TrustwardError};
use crate::locator::{Locator, TrustStorePath};
use crate::store::{probe, AdapterRegistry, Classifier, StoreError, StoreFormat};

/// The desired state applied to every discovered store.
#[derive(Debug, Clone)]
pub enum Target {
    Append(Certificate),
    Sync(Baseline),
}

impl Target {
    fn plan(&self) -> Plan<'_> {
        match self {
            Target::Append(cert) => Plan::Append(cert),
            Target::Sync(baseline) => Plan::Sync(baseline.certificates()),
        }
    }
}

/// A discovered store and its detected format.
#[derive(Debug, Clone, Serialize)]
pub struct ScanEntry {
    #[serde(flatten)]
    pub store: TrustStorePath,
    pub format: StoreFormat,
}

pub struct Driver {
    config: Arc<ReconcileConfig>,
    registry: Arc<AdapterRegistry>,
    classifier: Arc<Classifier>,
}

impl Driver {
    /// Driver with the standard adapters over the configured toolchain.
    pub fn new(config: ReconcileConfig) -> Self {
        let toolchain = Arc::new(config.toolchain());
        let registry = AdapterRegistry::standard(Arc::clone(&toolchain));
        Self::with_registry(config, registry, Classifier::new(toolchain))
    }

    pub fn with_registry(config: ReconcileConfig, registry: AdapterRegistry, classifier: Classifier) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            classifier: Arc::new(classifier),
        }
    }

    /// Walk `root` off the async runtime.
    pub async fn discover(&self, root: &Path) -> Result<Vec<TrustStorePath>> {
        let root = root.to_path_buf();
        let stores = tokio::task::spawn_blocking(move || Locator::new()?.discover(&root))
            .await
            .map_err(|e| TrustwardError::Internal(format!("discovery task failed: {}", e)))??;
        Ok(stores)
    }

    /// Discover and classify without opening anything.
    pub async fn scan(&self, root: &Path) -> Result<Vec<ScanEntry>> {
        let stores = self.discover(root).await?;
        let mut entries = Vec::with_capacity(stores.len());
        for store in stores {
            let format = match self.classifier.classify(store.path()).await {
                Ok(format) => format,
                Err(e) => {
                    tracing::warn!(path = %store.path().display(), error = %e, "Could not classify store");
                    StoreFormat::Unknown
                }
            };
            entries.push(ScanEntry { store, format });
        }
        Ok(entries)
    }

    /// Reconcile every store under `root` with `target`.
    pub async fn run(&self, root: &Path, target: Target) -> Result<RunReport> {
        let started_at = Utc::now();
        let stores = self.discover(root).await?;
        tracing::info!(
            stores = stores.len(),
            mode = ?self.config.mode,
            workers = self.config.concurrency,
            "Reconciling"
        );

        let target = Arc::new(target);
        let permits = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();

        for store in stores.iter().cloned() {
            let config = Arc::clone(&self.config);
            let registry = Arc::clone(&self.registry);
            let classifier = Arc::clone(&self.classifier);
            let target = Arc::clone(&target);
            let permits = Arc::clone(&permits);

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                process_store(&store, &config, &registry, &classifier, &target).await
            });
        }

        let mut records = Vec::with_capacity(stores.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(record) => records.push(record),
                Err(e) => tracing::error!(error = %e, "Store task aborted"),
            }
        }

        // A task that panicked still owes its store a record.
        if records.len() < stores.len() {
            let done: HashSet<PathBuf> = records.iter().map(|r| r.path.clone()).collect();
            let operation = target.plan().operation(self.config.mode);
            for store in stores.iter().filter(|s| !done.contains(s.path())) {
                let mut record = ModificationRecord::new(store, StoreFormat::Unknown, operation, self.config.mode);
                record.status = Status::Failed;
                record.recoverable = false;
                record.error = Some("store task aborted before reporting".into());
                records.push(record);
            }
        }

        let report = RunReport::new(records, started_at);
        let s = &report.summary;
        tracing::info!(
            found = s.found,
            succeeded = s.succeeded,
            unchanged = s.unchanged,
            failed = s.failed,
            rolled_back = s.rolled_back,
            skipped = s.skipped_unknown,
            "Run finished"
        );
        Ok(report)
    }
}

async fn process_store(
    store: &TrustStorePath,
    config: &ReconcileConfig,
    registry: &AdapterRegistry,
    classifier: &Classifier,
    target: &Target,
) -> ModificationRecord {
    let path = store.path();
    let plan = target.plan();
    let operation = plan.operation(config.mode);

    let format = match classifier.classify(path).await {
        Ok(format) => format,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not classify store");
            return ModificationRecord::new(store, StoreFormat::Unknown, operation, config.mode)
                .fail(Status::Failed, &e);
        }
    };
    let record = || ModificationRecord::new(store, format, operation, config.mode);

    if format == StoreFormat::Unknown {
        let e = StoreError::FormatUnknown(path.to_path_buf());
        tracing::warn!(path = %path.display(), "Unknown store format, skipping");
        return record().fail(Status::Skipped, &e);
    }

    let Some(adapter) = registry.adapter_for(format) else {
        let e = StoreError::ToolUnavailable {
            tool: format.to_string(),
            detail: "no adapter registered".into(),
        };
        return record().fail(Status::Failed, &e);
    };

    let probed = match probe(adapter.as_ref(), path, &config.candidates).await {
        Ok(probed) => probed,
        Err(e) => {
            tracing::warn!(path = %path.display(), format = %format, error = %e, "Could not open store");
            return record().fail(Status::Failed, &e);
        }
    };
    tracing::debug!(
        path = %path.display(),
        format = %format,
        certificates = probed.certificates.len(),
        tried = probed.tried,
        "Store opened"
    );

    MutationCoordinator::new(adapter.as_ref(), config)
        .reconcile(store, probed, plan)
        .await
}

// ─── Tests ───────────────────────────────────────────────────────────────────
