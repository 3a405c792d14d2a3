mod config;

pub use config::{Config, LogConfig, NotificationsConfig, Settings, TimerConfig, VaultConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/pomoforest[-dev]/` based on POMOFOREST_ENV.
///
/// Set POMOFOREST_ENV=dev to use development data directory.
/// POMOFOREST_CONFIG_DIR overrides the location entirely.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("POMOFOREST_CONFIG_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env =
                std::env::var("POMOFOREST_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("pomoforest-dev")
            } else {
                base_dir.join("pomoforest")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
