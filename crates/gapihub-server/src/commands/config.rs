//! Configuration commands.

use crate::config::AppConfig;
use crate::error::ServerResult;

/// Print the effective configuration as TOML.
pub fn dump(config: &AppConfig) -> ServerResult<()> {
    println!("# config.toml ({})", AppConfig::default_path().display());
    println!("{}", config.to_toml()?);
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> ServerResult<()> {
    println!("config: {}", AppConfig::default_path().display());
    Ok(())
}
