// Trustward — Application Entry Point
//
// Parses CLI arguments, initializes structured logging (with a filter that
// never emits store passwords), and dispatches to the command handler.
// Exit codes: 0 clean run, 1 some store failed or was rolled back, 2 fatal.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use trustward::cli::{execute, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose.
    let default_filter = if cli.verbose {
        "trustward=debug"
    } else {
        "trustward=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match execute(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}
