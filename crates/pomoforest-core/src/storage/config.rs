//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Work/break lengths and autostart
//! - Where completed sessions are logged, and the log line template
//! - Vault location and daily-note layout
//! - Notification preferences
//!
//! Configuration is stored at `~/.config/pomoforest/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;
use crate::log::{LogSettings, LogTarget, DEFAULT_LOG_TEMPLATE};
use crate::timer::TimerSettings;
use crate::vault::DailyNotes;

/// Timer lengths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_len")]
    pub work_len: u64,
    #[serde(default = "default_break_len")]
    pub break_len: u64,
    #[serde(default)]
    pub autostart: bool,
}

/// Session log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub target: LogTarget,
    /// Vault-relative file for the `file` target.
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_template")]
    pub template: String,
}

/// Vault configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Vault directory. Empty means the current directory.
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub daily_folder: String,
    #[serde(default = "default_daily_format")]
    pub daily_format: String,
    #[serde(default)]
    pub daily_template: String,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub sound: bool,
    /// Path to custom notification sound file (optional).
    /// If set, this file will be played instead of the system bell.
    #[serde(default)]
    pub custom_sound: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/pomoforest/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// What the timer service consumes from the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    pub timer: TimerSettings,
    pub log: LogSettings,
}

// Default functions
fn default_work_len() -> u64 {
    25
}
fn default_break_len() -> u64 {
    5
}
fn default_template() -> String {
    DEFAULT_LOG_TEMPLATE.into()
}
fn default_daily_format() -> String {
    "YYYY-MM-DD".into()
}
fn default_true() -> bool {
    true
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_len: default_work_len(),
            break_len: default_break_len(),
            autostart: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            target: LogTarget::None,
            path: String::new(),
            template: default_template(),
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: String::new(),
            daily_folder: String::new(),
            daily_format: default_daily_format(),
            daily_template: String::new(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
            custom_sound: None,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Location of `config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// key's type.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Project the configuration into what the timer service consumes.
    pub fn settings(&self) -> Settings {
        Settings {
            timer: TimerSettings {
                work_len: self.timer.work_len,
                break_len: self.timer.break_len,
                autostart: self.timer.autostart,
            },
            log: LogSettings {
                target: self.log.target,
                path: self.log.path.clone(),
                template: self.log.template.clone(),
            },
        }
    }

    /// Vault root directory.
    pub fn vault_root(&self) -> PathBuf {
        match self.vault.root.trim() {
            "" => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            root => expand_home(root),
        }
    }

    pub fn daily_notes(&self) -> DailyNotes {
        DailyNotes {
            folder: self.vault.daily_folder.clone(),
            format: self.vault.daily_format.clone(),
            template: self.vault.daily_template.clone(),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
