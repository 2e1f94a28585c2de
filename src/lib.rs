//! # ipfilter - temporary IP allow-list served over HTTP
//!
//! Clients add their own address (or any address) to an allow-list that is
//! enforced through an external packet-filter command. Entries that are not
//! refreshed within a TTL are evicted in the background.
//!
//! ## Features
//!
//! - **Self-service** - `POST /api/me/add` allows the caller's own address
//! - **Firewall-backed** - every entry maps to one `ufw` rule, optionally run through `sudo`
//! - **Self-cleaning** - stale entries are evicted on a fixed cadence
//! - **Consistent** - failed firewall commands are rolled back in memory
//! - **Graceful** - SIGINT/SIGTERM drain in-flight requests within a grace period
//! - **Optional basic auth** - static user table, passwords zeroed on drop
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        ipfilter                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: serve, check-config, default-config        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Server (axum + askama)          Scheduler (tokio)          │
//! │    ├── /api/me/*, /api/ip/*        └── DeleteOutOfDate      │
//! │    └── basic auth                      every poll_interval  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Registry (in-memory allow-list, serialised mutations)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Enforcer (rule templates) → CommandExecutor (tokio process)│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use ipfilter::config::Config;
//! use ipfilter::commands::serve::build_registry;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("/etc/ipfilter/config.yaml")?;
//!     let registry = build_registry(&config)?;
//!
//!     let cancel = CancellationToken::new();
//!     registry.add_ip("203.0.113.7", &cancel).await?;
//!     for entry in registry.list() {
//!         println!("{} since {}", entry.ip, entry.created_at);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`clock`] - Real and fixed time sources
//! - [`cmd_abstraction`] - External command execution with cancellation
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration parsing and validation
//! - [`enforcer`] - Firewall rule templates
//! - [`error`] - Allow-list error taxonomy
//! - [`registry`] - The allow-list itself
//! - [`scheduler`] - Periodic eviction of stale entries
//! - [`server`] - HTTP surface and graceful shutdown
//! - [`signal`] - Signal handling and deadlines
//! - [`validation`] - Input validation

pub mod cli;
pub mod clock;
pub mod cmd_abstraction;
pub mod commands;
pub mod config;
pub mod enforcer;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod server;
pub mod signal;
pub mod validation;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::AllowlistError;
pub use registry::{IpEntry, Registry};
