//! ufw rule template.

use super::RuleAction;
use crate::config::FirewallConfig;

/// Arguments (without the program) for an allow or remove rule.
///
/// `ufw allow from <ip> to any proto <proto> port <port>`
/// `ufw delete allow from <ip> to any proto <proto> port <port>`
pub fn rule_args(action: RuleAction, ip: &str, firewall: &FirewallConfig) -> Vec<String> {
    let mut args = Vec::with_capacity(10);
    if action == RuleAction::Remove {
        args.push("delete".to_string());
    }
    args.extend([
        "allow".to_string(),
        "from".to_string(),
        ip.to_string(),
        "to".to_string(),
        "any".to_string(),
        "proto".to_string(),
        firewall.proto.to_string(),
        "port".to_string(),
        firewall.port.to_string(),
    ]);
    args
}
