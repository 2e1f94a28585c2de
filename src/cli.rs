//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ipfilter")]
#[command(author, version, about = "Temporary IP allow-list served over HTTP")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "/etc/ipfilter/config.yaml", global = true)]
    pub config: PathBuf,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server and the eviction scheduler
    Serve {
        /// Override the configured listen address (IP:PORT)
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate the configuration file and print the effective settings
    CheckConfig,

    /// Print a commented default configuration
    DefaultConfig,

    /// Show version
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses_help() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_version_command() {
        let cli = Cli::try_parse_from(["ipfilter", "version"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_cli_serve_defaults() {
        let cli = Cli::try_parse_from(["ipfilter", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { listen } => assert!(listen.is_none()),
            _ => panic!("Expected Serve command"),
        }
        assert_eq!(cli.config, PathBuf::from("/etc/ipfilter/config.yaml"));
        assert!(!cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_cli_serve_with_listen() {
        let cli =
            Cli::try_parse_from(["ipfilter", "serve", "--listen", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Commands::Serve { listen } => assert_eq!(listen.as_deref(), Some("0.0.0.0:9000")),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ipfilter",
            "check-config",
            "--config",
            "/tmp/ipfilter.yaml",
            "-v",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::CheckConfig));
        assert_eq!(cli.config, PathBuf::from("/tmp/ipfilter.yaml"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_default_config_command() {
        let cli = Cli::try_parse_from(["ipfilter", "default-config"]).unwrap();
        assert!(matches!(cli.command, Commands::DefaultConfig));
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["ipfilter", "update"]).is_err());
    }
}
