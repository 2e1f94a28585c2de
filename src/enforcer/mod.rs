//! Firewall rule commands.
//!
//! Translates an allow/remove intent for one IP into the argv of the external
//! packet-filter command, optionally wrapped by a privilege-elevation program.

mod ufw;

use crate::config::{FirewallConfig, Wrapper};

pub use ufw::rule_args;

/// What the firewall command should do for an IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// Install the allow rule
    Allow,
    /// Remove the allow rule
    Remove,
}

impl std::fmt::Display for RuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleAction::Allow => f.write_str("allow"),
            RuleAction::Remove => f.write_str("remove"),
        }
    }
}

/// A fully resolved command line: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Builds firewall invocations from a fixed template parameterised by IP.
#[derive(Debug, Clone)]
pub struct RuleCommand {
    wrapper: Wrapper,
    firewall: FirewallConfig,
}

impl RuleCommand {
    pub fn new(wrapper: Wrapper, firewall: FirewallConfig) -> Self {
        Self { wrapper, firewall }
    }

    /// Resolve the invocation for `action` on `ip`.
    ///
    /// `ip` must already be validated; it is passed as a single argv element
    /// and never goes through a shell.
    pub fn invocation(&self, action: RuleAction, ip: &str) -> Invocation {
        let rule = rule_args(action, ip, &self.firewall);

        let (program, mut args) = match self.wrapper {
            Wrapper::None => return Invocation {
                program: self.firewall.program.clone(),
                args: rule,
            },
            // -n: fail instead of prompting for a password
            Wrapper::Sudo => ("sudo", vec!["-n".to_string()]),
            Wrapper::Echo => ("echo", Vec::with_capacity(rule.len() + 1)),
        };
        args.push(self.firewall.program.clone());
        args.extend(rule);

        Invocation {
            program: program.to_string(),
            args,
        }
    }
}

impl Default for RuleCommand {
    fn default() -> Self {
        Self::new(Wrapper::default(), FirewallConfig::default())
    }
}

/// Check if running as root (effective UID == 0)
///
/// Used at start-up to warn when the firewall command is invoked without a
/// privilege wrapper by an unprivileged process.
pub fn is_root() -> bool {
    // SAFETY: geteuid() is a simple syscall that reads the effective user ID.
    // It has no preconditions, never fails, and doesn't modify any state.
    unsafe { libc::geteuid() == 0 }
}
