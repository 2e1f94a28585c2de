//! CLI command implementations.

pub mod check_config;
pub mod default_config;
pub mod serve;
