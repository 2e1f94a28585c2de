//! Serve command: runs the HTTP server and the eviction scheduler side by
//! side until SIGINT/SIGTERM, then waits for both to finish.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cmd_abstraction::TokioCommandExecutor;
use crate::config::{Config, Wrapper};
use crate::enforcer::{is_root, RuleCommand};
use crate::registry::{IpEntry, Registry};
use crate::scheduler::EvictionScheduler;
use crate::server::{self, AppState, BasicAuth};
use crate::signal::spawn_signal_listener;

/// Run the serve command
pub async fn run(config_path: &Path, listen: Option<String>) -> Result<()> {
    let mut config = Config::load_or_default(config_path)?;
    if let Some(listen) = listen {
        config.listen = listen;
        config.validate().context("Invalid --listen")?;
    }

    match config.wrapper {
        Wrapper::None if !is_root() => warn!(
            "wrapper is 'none' but not running as root; {} will probably fail",
            config.firewall.program
        ),
        Wrapper::Echo => warn!("wrapper is 'echo': firewall commands are only printed"),
        _ => {}
    }

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", listener.local_addr()?);

    let shutdown = CancellationToken::new();
    let signals = spawn_signal_listener(shutdown.clone());

    let result = supervise(&config, listener, shutdown.clone()).await;
    shutdown.cancel();
    let _ = signals.await;

    let snapshot = result?;
    info!("Stopped with {} allowed address(es)", snapshot.len());
    Ok(())
}

/// Build the registry wired to the configured clock and firewall command.
pub fn build_registry(config: &Config) -> Result<Arc<Registry>> {
    let executor = TokioCommandExecutor::new(config.command_timeout()?);
    let rules = RuleCommand::new(config.wrapper, config.firewall.clone());
    Ok(Arc::new(Registry::new(
        config.build_clock()?,
        Arc::new(executor),
        rules,
    )))
}

/// Serve on `listener` and evict in the background until `shutdown` fires.
///
/// Returns the registry snapshot logged by the scheduler on its way out.
pub async fn supervise(
    config: &Config,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> Result<Vec<IpEntry>> {
    let registry = build_registry(config)?;
    let policy = config.eviction_policy()?;
    let grace = config.shutdown_grace()?;

    let auth = BasicAuth::from_config(&config.auth);
    if let Some(ref auth) = auth {
        info!("Basic auth enabled (login at {})", auth.login_path());
    }

    let abort = CancellationToken::new();
    let app = server::router(AppState::new(Arc::clone(&registry), abort.clone(), auth));

    let scheduler = EvictionScheduler::new(registry, policy).spawn(shutdown.clone());
    let server = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = server::serve(listener, app, shutdown.clone(), abort, grace).await;
            // The scheduler must not outlive a server that stopped on its own
            shutdown.cancel();
            result
        })
    };

    let (server, scheduler) = tokio::join!(server, scheduler);
    let snapshot = scheduler.context("Eviction scheduler panicked")?;
    server
        .context("HTTP server panicked")?
        .context("HTTP server failed")?;

    Ok(snapshot)
}
