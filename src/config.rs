//! Configuration management for ipfilter.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::clock::{parse_datetime, Clock, FixedClock, SystemClock};
use crate::scheduler::EvictionPolicy;
use crate::validation::{parse_interval, validate_http_path, validate_interval, validate_listen_addr};

/// Secure string type that zeroizes memory on drop
/// Used for sensitive data like passwords
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecureString(String);

impl SecureString {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listen address (IP:PORT)
    pub listen: String,

    /// Privilege-elevation wrapper for the firewall command (none, sudo, echo)
    pub wrapper: Wrapper,

    /// Time source (real, fixed)
    pub clock: ClockSource,

    /// Pinned time for `clock: fixed`, as "YYYY-MM-DD HH:MM:SS" (UTC)
    pub fixed_time: Option<String>,

    /// Upper bound for a single firewall command
    pub command_timeout: String,

    /// How long in-flight requests may run once shutdown starts
    pub shutdown_grace: String,

    /// Automatic eviction of stale entries
    pub eviction: EvictionConfig,

    /// Firewall rule template
    pub firewall: FirewallConfig,

    /// Optional basic-auth gate in front of mutation routes
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            wrapper: Wrapper::Sudo,
            clock: ClockSource::Real,
            fixed_time: None,
            command_timeout: "10s".to_string(),
            shutdown_grace: "3s".to_string(),
            eviction: EvictionConfig::default(),
            firewall: FirewallConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            tracing::warn!(
                "Config file {:?} not found, using defaults",
                path.as_ref()
            );
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(content).context("Failed to parse config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        validate_listen_addr(&self.listen)?;

        for (key, value) in [
            ("command_timeout", &self.command_timeout),
            ("shutdown_grace", &self.shutdown_grace),
            ("eviction.ttl", &self.eviction.ttl),
            ("eviction.poll_interval", &self.eviction.poll_interval),
            ("eviction.iteration_timeout", &self.eviction.iteration_timeout),
        ] {
            validate_interval(value).with_context(|| format!("Invalid {}", key))?;
        }

        match (self.clock, &self.fixed_time) {
            (ClockSource::Fixed, None) => {
                anyhow::bail!("clock: fixed requires fixed_time (YYYY-MM-DD HH:MM:SS)")
            }
            (_, Some(value)) => {
                parse_datetime(value).context("Invalid fixed_time")?;
            }
            (ClockSource::Real, None) => {}
        }

        if self.firewall.program.trim().is_empty() {
            anyhow::bail!("firewall.program cannot be empty");
        }
        if self.firewall.port == 0 {
            anyhow::bail!("firewall.port must be between 1 and 65535");
        }

        validate_http_path(&self.auth.login_path).context("Invalid auth.login_path")?;
        if self.auth.login_path == "/" || self.auth.login_path.starts_with("/api/") {
            anyhow::bail!(
                "auth.login_path '{}' collides with an application route",
                self.auth.login_path
            );
        }
        if self.auth.realm.contains('"') || self.auth.realm.chars().any(|c| c.is_control()) {
            anyhow::bail!("auth.realm must not contain quotes or control characters");
        }

        if self.auth.enabled && self.auth.users.is_empty() {
            anyhow::bail!("auth.enabled requires at least one user");
        }
        for user in &self.auth.users {
            if user.username.is_empty() || user.username.contains(':') {
                anyhow::bail!(
                    "Invalid username '{}': must be non-empty and contain no ':'",
                    user.username
                );
            }
            if self.auth.enabled && user.get_password().is_empty() {
                anyhow::bail!("User '{}' has an empty password", user.username);
            }
        }

        Ok(())
    }

    /// Parsed listen address
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        validate_listen_addr(&self.listen)
    }

    pub fn command_timeout(&self) -> Result<Duration> {
        parse_interval(&self.command_timeout)
    }

    pub fn shutdown_grace(&self) -> Result<Duration> {
        parse_interval(&self.shutdown_grace)
    }

    /// Eviction scheduler knobs
    pub fn eviction_policy(&self) -> Result<EvictionPolicy> {
        Ok(EvictionPolicy {
            ttl: parse_interval(&self.eviction.ttl)?,
            poll_interval: parse_interval(&self.eviction.poll_interval)?,
            iteration_timeout: parse_interval(&self.eviction.iteration_timeout)?,
        })
    }

    /// Instantiate the configured time source
    pub fn build_clock(&self) -> Result<Arc<dyn Clock>> {
        match (self.clock, &self.fixed_time) {
            (ClockSource::Real, _) => Ok(Arc::new(SystemClock)),
            (ClockSource::Fixed, Some(value)) => Ok(Arc::new(FixedClock::at(value)?)),
            (ClockSource::Fixed, None) => anyhow::bail!("clock: fixed requires fixed_time"),
        }
    }

    /// Generate default config with comments
    pub fn generate_default_yaml() -> String {
        include_str!("../templates/config.yaml").to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Wrapper {
    /// Run the firewall program directly (process must be root)
    None,
    /// Prefix with `sudo -n`
    #[default]
    Sudo,
    /// Prefix with `echo`: log the rule instead of applying it
    Echo,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    #[default]
    Real,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvictionConfig {
    /// Entries not refreshed within this window are evicted
    pub ttl: String,
    /// Delay between eviction passes
    pub poll_interval: String,
    /// Deadline for a single eviction pass
    pub iteration_timeout: String,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            ttl: "15s".to_string(),
            poll_interval: "1s".to_string(),
            iteration_timeout: "10s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FirewallConfig {
    /// Packet-filter program
    pub program: String,
    /// Protocol the allow rule opens
    pub proto: Proto,
    /// Service port the allow rule opens
    pub port: u16,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            program: "ufw".to_string(),
            proto: Proto::Tcp,
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Proto {
    #[default]
    Tcp,
    Udp,
}

impl std::fmt::Display for Proto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Proto::Tcp => f.write_str("tcp"),
            Proto::Udp => f.write_str("udp"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    /// Realm announced in the WWW-Authenticate challenge
    pub realm: String,
    /// Where unauthenticated requests are redirected
    pub login_path: String,
    pub users: Vec<UserConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            realm: "Restricted".to_string(),
            login_path: "/login".to_string(),
            users: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserConfig {
    pub username: String,
    /// Memory is securely zeroed when dropped
    pub password: SecureString,
    /// Environment variable name to read the password from (optional)
    pub password_env: Option<String>,
}

impl UserConfig {
    /// Get the effective password, checking the env var first if configured
    pub fn get_password(&self) -> SecureString {
        if let Some(ref env_name) = self.password_env {
            if let Ok(val) = env::var(env_name) {
                return SecureString::new(val);
            }
        }
        self.password.clone()
    }
}
