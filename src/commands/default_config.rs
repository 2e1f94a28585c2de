//! Default-config command implementation.

use anyhow::Result;

use crate::config::Config;

/// Print the commented default configuration to stdout
pub fn run() -> Result<()> {
    print!("{}", Config::generate_default_yaml());
    Ok(())
}
