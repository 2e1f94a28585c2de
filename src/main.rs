//! ipfilter - temporary IP allow-list served over HTTP
//!
//! Keeps a firewall allow-list in step with an in-memory registry and evicts
//! entries that are not refreshed in time.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use ipfilter::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve { listen } => ipfilter::commands::serve::run(&cli.config, listen).await,
        Commands::CheckConfig => ipfilter::commands::check_config::run(&cli.config),
        Commands::DefaultConfig => ipfilter::commands::default_config::run(),
        Commands::Version => {
            println!("ipfilter {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
