// Trustward — CLI Command Handlers
//
// Each function handles one CLI subcommand: it turns flags into a
// `ReconcileConfig`, runs the driver and prints the outcome. The returned
// integer is the process exit code.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;

use crate::baseline::{Baseline, BaselineSource};
use crate::certificate::{parse_certificates, Certificate};
use crate::error::{Result, TrustwardError};
use crate::reconcile::{
    BackupPolicy, Driver, Mode, ModificationRecord, ReconcileConfig, RunReport, ScanEntry, Status,
    Target, DEFAULT_PASSWORDS,
};

use super::{Commands, RunArgs};

/// Execute the parsed CLI command.
pub async fn execute(command: Commands) -> Result<i32> {
    match command {
        Commands::Scan { dir, json } => cmd_scan(&dir, json).await,
        Commands::Append { dir, cert, run } => cmd_append(&dir, &cert, run).await,
        Commands::Sync {
            dir,
            baseline,
            fallback,
            insecure,
            compare_only,
            run,
        } => cmd_sync(&dir, &baseline, fallback, insecure, compare_only, run).await,
    }
}

// ─── Scan ────────────────────────────────────────────────────────────────────

async fn cmd_scan(dir: &Path, json: bool) -> Result<i32> {
    let driver = Driver::new(ReconcileConfig::default());
    let entries = driver.scan(dir).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(0);
    }

    if entries.is_empty() {
        println!("No trust stores found under {}", dir.display());
        return Ok(0);
    }

    println!("Trust stores ({}):\n", entries.len());
    for ScanEntry { store, format } in &entries {
        println!(
            "  {:8} │ {:32} │ {}",
            format,
            store.provenance().to_string(),
            store.path().display()
        );
    }

    Ok(0)
}

// ─── Append ──────────────────────────────────────────────────────────────────

async fn cmd_append(dir: &Path, cert_path: &Path, run: RunArgs) -> Result<i32> {
    let cert = read_single_certificate(cert_path).await?;
    if cert.is_expired_at(Utc::now()) {
        tracing::warn!(certificate = %cert, "Certificate is already expired");
    }

    let json = run.json;
    let driver = Driver::new(build_config(&run, false)?);
    let report = driver.run(dir, Target::Append(cert)).await?;

    print_report(&report, json)?;
    Ok(report.exit_code())
}

async fn read_single_certificate(path: &Path) -> Result<Certificate> {
    let bytes = tokio::fs::read(path).await?;
    let mut certs = parse_certificates(&bytes)?;
    match certs.len() {
        1 => Ok(certs.remove(0)),
        n => Err(TrustwardError::Other(format!(
            "{} holds {} certificates; append expects exactly one",
            path.display(),
            n
        ))),
    }
}

// ─── Sync ────────────────────────────────────────────────────────────────────

async fn cmd_sync(
    dir: &Path,
    baseline: &str,
    fallback: Option<PathBuf>,
    insecure: bool,
    compare_only: bool,
    run: RunArgs,
) -> Result<i32> {
    let config = build_config(&run, compare_only)?;
    let source = BaselineSource::parse(baseline)?
        .with_fallback(fallback)
        .with_tls_verification(!insecure);

    // A missing baseline is fatal: nothing can be diffed without it.
    let baseline = Baseline::load(&source, config.tool_timeout).await?;

    let json = run.json;
    let driver = Driver::new(config);
    let report = driver.run(dir, Target::Sync(baseline)).await?;

    print_report(&report, json)?;
    Ok(report.exit_code())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Flags to a validated config. User passwords go before the built-in list.
fn build_config(run: &RunArgs, compare_only: bool) -> Result<ReconcileConfig> {
    let mode = if compare_only {
        Mode::CompareOnly
    } else if run.dry_run {
        Mode::DryRun
    } else {
        Mode::Apply
    };

    let candidates = run
        .passwords
        .iter()
        .cloned()
        .chain(DEFAULT_PASSWORDS.iter().map(|s| s.to_string()));

    let config = ReconcileConfig::builder()
        .mode(mode)
        .candidates(candidates)
        .backup(BackupPolicy {
            enabled: !run.no_backup,
            dir: run.backup_dir.clone(),
            retain: run.retain_backups,
            retention_days: run.backup_retention_days,
        })
        .concurrency(run.concurrency)
        .tool_timeout(Duration::from_secs(run.timeout))
        .keytool(run.keytool.clone())
        .openssl(run.openssl.clone())
        .build()?;

    tracing::debug!(config = ?config, "Run configuration");
    Ok(config)
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if report.records.is_empty() {
        println!("No trust stores found.");
        return Ok(());
    }

    for record in &report.records {
        print_record(record);
    }

    let s = &report.summary;
    println!();
    println!(
        "{} found │ {} updated │ {} unchanged │ {} failed │ {} rolled back │ {} unknown format",
        s.found, s.succeeded, s.unchanged, s.failed, s.rolled_back, s.skipped_unknown
    );
    Ok(())
}

fn print_record(record: &ModificationRecord) {
    let marker = match record.status {
        Status::Success | Status::Noop => "✓",
        Status::Failed => "✗",
        Status::RolledBack => "↺",
        Status::Skipped => "?",
    };
    let changes = match record.mode {
        Mode::Apply => record.added.len(),
        Mode::DryRun => record.planned.len(),
        Mode::CompareOnly => record.missing.len(),
    };
    println!(
        "  {} {:11} │ {:8} │ +{:<3} │ {}",
        marker,
        record.status,
        record.format,
        changes,
        record.path.display()
    );

    if !record.extra.is_empty() {
        println!("      {} certificate(s) not in baseline (left in place)", record.extra.len());
    }
    for warning in &record.warnings {
        println!("      warning: {}", warning);
    }
    if let Some(error) = &record.error {
        println!("      error: {}", error);
    }
    if let Some(backup) = &record.backup_path {
        println!("      backup: {}", backup.display());
    }
    if !record.recoverable {
        println!("      store was changed without a backup");
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
