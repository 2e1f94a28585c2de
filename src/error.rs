//! Error types for ipfilter.

use thiserror::Error;

use crate::cmd_abstraction::CommandError;
use crate::registry::IpEntry;

#[derive(Error, Debug)]
pub enum AllowlistError {
    #[error("Invalid IP address: {0}")]
    InvalidAddress(String),

    #[error("IP address not found: {0}")]
    NotFound(String),

    #[error("Firewall command failed for {ip}: {source}")]
    CommandExecutionFailed {
        ip: String,
        #[source]
        source: CommandError,
    },

    #[error("Malformed request: {0}")]
    RequestMalformed(String),

    #[error("Cannot resolve peer address: {0}")]
    PeerAddressUnresolvable(String),

    #[error("Cancelled while waiting for another firewall change")]
    Cancelled,
}

/// An eviction pass that stopped at the first failing command.
///
/// `removed` holds the entries that were evicted before the failure; they are
/// not restored.
#[derive(Error, Debug)]
#[error("eviction stopped after {} entries: {source}", removed.len())]
pub struct PartialEviction {
    pub removed: Vec<IpEntry>,
    #[source]
    pub source: AllowlistError,
}
