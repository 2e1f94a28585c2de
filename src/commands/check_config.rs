//! Check-config command implementation.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;

/// Load and validate the config file, then print the effective settings
pub fn run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let policy = config.eviction_policy()?;

    println!();
    println!("Config: {} (valid)", config_path.display());
    println!();
    println!("Listen:           {}", config.listen_addr()?);
    println!("Wrapper:          {:?}", config.wrapper);
    println!("Clock:            {:?}", config.clock);
    if let Some(ref fixed) = config.fixed_time {
        println!("Fixed time:       {}", fixed);
    }
    println!(
        "Firewall rule:    {} allow from <ip> to any proto {} port {}",
        config.firewall.program, config.firewall.proto, config.firewall.port
    );
    println!("Command timeout:  {:?}", config.command_timeout()?);
    println!("Shutdown grace:   {:?}", config.shutdown_grace()?);
    println!();
    println!("Eviction TTL:     {:?}", policy.ttl);
    println!("Poll interval:    {:?}", policy.poll_interval);
    println!("Pass deadline:    {:?}", policy.iteration_timeout);
    println!();

    if config.auth.enabled {
        println!(
            "Basic auth:       enabled ({} user(s), login at {})",
            config.auth.users.len(),
            config.auth.login_path
        );
    } else {
        println!("Basic auth:       disabled");
    }
    println!();

    Ok(())
}
