mod types;

pub use types::*;

use crate::{Error, Result};
use std::{env, path::Path};
use tracing::debug;

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    let mut config = load_from(&config_path).await?;
    config.apply_env_overrides(|key| env::var(key).ok())?;

    Ok(config)
}

/// Reads a YAML config file; a missing file yields the defaults.
pub async fn load_from(config_path: &str) -> Result<Config> {
    if !Path::new(config_path).exists() {
        debug!("No configuration file at {}, using defaults", config_path);
        return Ok(Config::default());
    }

    debug!("Loading configuration from: {}", config_path);

    let config_str = tokio::fs::read_to_string(config_path).await?;
    let config: Config = serde_yaml::from_str(&config_str)?;

    Ok(config)
}

impl Config {
    /// Applies `MODEL_PATH`, `HOST`, `PORT` and `DEBUG` on top of the file values.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("MODEL_PATH").filter(|p| !p.trim().is_empty()) {
            self.model.path = path;
        }

        if let Some(host) = lookup("HOST").filter(|h| !h.trim().is_empty()) {
            self.server.host = host;
        }

        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("Invalid PORT: '{}'", port)))?;
        }

        if let Some(debug) = lookup("DEBUG") {
            self.server.debug = parse_flag(&debug)
                .ok_or_else(|| Error::config(format!("Invalid DEBUG flag: '{}'", debug)))?;
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
