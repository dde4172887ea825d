// Trustward — CLI Module
//
// Command-line interface using clap derive macros.
// Subcommands: scan, append, sync.

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub use commands::execute;

/// Trustward — finds trust stores and reconciles them with a certificate or baseline.
#[derive(Parser, Debug)]
#[command(name = "trustward")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG still wins when set).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every trust store under a directory with its detected format.
    Scan {
        /// Directory to scan.
        #[arg(long)]
        dir: PathBuf,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Add one certificate to every store that lacks it.
    Append {
        /// Directory to scan.
        #[arg(long)]
        dir: PathBuf,

        /// PEM or DER file holding the certificate.
        #[arg(long)]
        cert: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Add every baseline certificate a store lacks. Extra entries are reported, never removed.
    Sync {
        /// Directory to scan.
        #[arg(long)]
        dir: PathBuf,

        /// Baseline bundle: a local path or an http(s) URL.
        #[arg(long)]
        baseline: String,

        /// Local copy used when the baseline download fails.
        #[arg(long)]
        fallback: Option<PathBuf>,

        /// Skip TLS certificate verification for the baseline download.
        #[arg(long)]
        insecure: bool,

        /// Only report the diff; never plan or perform changes.
        #[arg(long, conflicts_with = "dry_run")]
        compare_only: bool,

        #[command(flatten)]
        run: RunArgs,
    },
}

/// Options shared by the mutating commands.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Store password to try, in order, before the built-in list. Repeatable.
    #[arg(long = "password", value_name = "PASSWORD")]
    pub passwords: Vec<String>,

    /// Report planned changes without touching any store.
    #[arg(long)]
    pub dry_run: bool,

    /// Mutate without taking a backup first (changes cannot be rolled back).
    #[arg(long)]
    pub no_backup: bool,

    /// Directory for backups (default: next to each store).
    #[arg(long)]
    pub backup_dir: Option<PathBuf>,

    /// Keep backups after a successful change.
    #[arg(long)]
    pub retain_backups: bool,

    /// Delete backups older than this many days after a successful change.
    #[arg(long, value_name = "DAYS")]
    pub backup_retention_days: Option<u32>,

    /// Stores processed in parallel.
    #[arg(long, default_value_t = crate::reconcile::DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Seconds before a keytool/openssl call or baseline download is abandoned.
    #[arg(long, value_name = "SECONDS", default_value = "60")]
    pub timeout: u64,

    /// Path to keytool (default: PATH, JAVA_HOME, then common JVM directories).
    #[arg(long)]
    pub keytool: Option<PathBuf>,

    /// Path to openssl (default: PATH).
    #[arg(long)]
    pub openssl: Option<PathBuf>,

    /// Print the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
