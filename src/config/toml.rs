//! TOML configuration file parsing
//!
//! A configuration file carries the same sections as `Config`:
//!
//! ```toml
//! [target]
//! path = "/dev/sdb"
//! direct = true
//! range = { unit = "lba", start = 0, stop = 1048575 }
//!
//! [workload]
//! read = true
//! write = true
//! transfer_low = 1
//! transfer_high = 128
//! access = { kind = "linear", sweep = "bounce" }
//! pattern = { kind = "fixed", value = 0xdeadbeef }
//! compare = 0
//!
//! [runtime]
//! workers = 8
//! run_time = 3600
//! heartbeat = 60
//! ```

use super::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}
