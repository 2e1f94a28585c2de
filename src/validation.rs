//! Centralized validation functions for ipfilter.
//!
//! This module provides unified validation for:
//! - IP address literals (allow-list keys)
//! - Durations in interval format (`30s`, `5m`, `1h`, `1d`)
//! - Listen addresses and HTTP paths from the configuration

use anyhow::{bail, Result};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::error::AllowlistError;

/// Validate an IP address literal and return the parsed IpAddr.
///
/// Only exact addresses are accepted; CIDR ranges, hostnames and
/// surrounding whitespace are rejected.
///
/// # Examples
/// ```
/// use ipfilter::validation::validate_ip;
/// assert!(validate_ip("192.168.1.1").is_ok());
/// assert!(validate_ip("::1").is_ok());
/// assert!(validate_ip("192.168.1.0/24").is_err());
/// ```
pub fn validate_ip(ip_str: &str) -> Result<IpAddr, AllowlistError> {
    ip_str
        .parse()
        .map_err(|_| AllowlistError::InvalidAddress(ip_str.to_string()))
}

/// Validate an IP literal and return its canonical text form.
///
/// IPv6 is shortened (`0:0:0:0:0:0:0:1` becomes `::1`) and IPv4-mapped IPv6
/// addresses collapse to IPv4, so one host always maps to one registry key.
///
/// # Examples
/// ```
/// use ipfilter::validation::canonical_ip;
/// assert_eq!(canonical_ip("0:0:0:0:0:0:0:1").unwrap(), "::1");
/// assert_eq!(canonical_ip("::ffff:10.0.0.1").unwrap(), "10.0.0.1");
/// ```
pub fn canonical_ip(ip_str: &str) -> Result<String, AllowlistError> {
    Ok(validate_ip(ip_str)?.to_canonical().to_string())
}

/// Parse an interval string into a Duration with detailed error messages.
///
/// Accepts formats like: 30s, 5m, 4h, 1d
///
/// # Errors
/// Returns an error with a descriptive message if the interval is invalid.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use ipfilter::validation::parse_interval;
/// assert_eq!(parse_interval("15s").unwrap(), Duration::from_secs(15));
/// assert_eq!(parse_interval("2m").unwrap(), Duration::from_secs(120));
/// assert!(parse_interval("invalid").is_err());
/// ```
pub fn parse_interval(interval: &str) -> Result<Duration> {
    if interval.is_empty() {
        bail!("Interval cannot be empty");
    }

    // Reject non-ASCII to prevent Unicode edge cases with split_at
    if !interval.is_ascii() {
        bail!("Invalid interval '{}'. Only ASCII characters allowed", interval);
    }

    if interval.len() < 2 {
        bail!(
            "Invalid interval '{}'. Use format like '15s', '5m', '1h'",
            interval
        );
    }

    let (num_part, suffix) = interval.split_at(interval.len() - 1);

    let multiplier: u64 = match suffix {
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        _ => bail!(
            "Invalid interval '{}'. Suffix must be s, m, h, or d",
            interval
        ),
    };

    let value = num_part.parse::<u32>().map_err(|_| {
        anyhow::anyhow!(
            "Invalid interval '{}'. Number part must be a positive integer",
            interval
        )
    })?;

    Ok(Duration::from_secs(u64::from(value) * multiplier))
}

/// Validate an interval and require it to be non-zero.
pub fn validate_interval(interval: &str) -> Result<()> {
    if parse_interval(interval)?.is_zero() {
        bail!("Interval '{}' must be greater than zero", interval);
    }
    Ok(())
}

/// Validate a listen address such as `127.0.0.1:8080` or `[::1]:8080`.
pub fn validate_listen_addr(addr: &str) -> Result<SocketAddr> {
    addr.parse()
        .map_err(|_| anyhow::anyhow!("Invalid listen address '{}'. Use IP:PORT", addr))
}

/// Validate an absolute HTTP path used for redirects (e.g. the login path).
pub fn validate_http_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        bail!("Path '{}' must start with '/'", path);
    }
    if path.starts_with("//") {
        bail!("Path '{}' must not start with '//'", path);
    }
    if path.chars().any(|c| c.is_control() || c.is_whitespace()) {
        bail!("Path '{}' contains whitespace or control characters", path);
    }
    if path.contains([':', '*', '{', '}', '?', '#']) {
        bail!("Path '{}' contains reserved characters", path);
    }
    Ok(())
}
