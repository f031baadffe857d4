pub mod persist;
mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./webpforge.toml",
        "~/.config/webpforge/config.toml",
        "/etc/webpforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.limits.max_files == 0 {
        anyhow::bail!("limits.max_files cannot be 0");
    }

    if config.limits.max_file_size_mb == 0 {
        anyhow::bail!("limits.max_file_size_mb cannot be 0");
    }

    if config.notifications.ttl_ms == 0 {
        anyhow::bail!("notifications.ttl_ms cannot be 0");
    }

    if config.conversion.encode_timeout_secs == Some(0) {
        anyhow::bail!("conversion.encode_timeout_secs cannot be 0; omit it to disable the timeout");
    }

    if config.ingest.input_reset_delay_ms == 0 {
        tracing::warn!("ingest.input_reset_delay_ms is 0; selections are cleared immediately");
    }

    Ok(())
}
