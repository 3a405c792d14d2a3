//! Where completed-session lines end up.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::vault::{path, FileStore};

/// Log destination chosen in settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Append to today's daily note, creating it if needed.
    #[serde(alias = "daily_note")]
    Daily,
    /// Append to a fixed file.
    File,
    #[default]
    None,
}

impl std::str::FromStr for LogTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "daily_note" => Ok(LogTarget::Daily),
            "file" => Ok(LogTarget::File),
            "none" => Ok(LogTarget::None),
            other => Err(format!("unknown log target '{other}' (expected daily, file or none)")),
        }
    }
}

/// Persistence part of the settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    pub target: LogTarget,
    /// File used by [`LogTarget::File`].
    pub path: String,
    pub template: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            target: LogTarget::None,
            path: String::new(),
            template: super::DEFAULT_LOG_TEMPLATE.to_string(),
        }
    }
}

/// Writes formatted log lines into a [`FileStore`].
#[derive(Clone)]
pub struct LogPersister {
    store: Arc<dyn FileStore>,
}

impl LogPersister {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    /// Persist one line.
    ///
    /// `today` selects the daily note. Returns the path written, or `None`
    /// when the settings say not to log.
    pub fn save(
        &self,
        line: &str,
        settings: &LogSettings,
        today: NaiveDate,
    ) -> Result<Option<String>, PersistError> {
        match settings.target {
            LogTarget::None => Ok(None),
            LogTarget::Daily => {
                let note = self.daily_note(today)?;
                self.append(&note, line)?;
                Ok(Some(note))
            }
            LogTarget::File => {
                let target = path::normalize(settings.path.trim());
                if target.is_empty() || target == "/" {
                    tracing::debug!("log target is a file but no path is configured");
                    return Ok(None);
                }
                self.ensure_folders(&target)?;
                if self.store.exists(&target) {
                    self.append(&target, line)?;
                } else {
                    self.store
                        .create(&target, line)
                        .map_err(|source| PersistError::Write {
                            path: target.clone(),
                            source,
                        })?;
                }
                Ok(Some(target))
            }
        }
    }

    fn daily_note(&self, date: NaiveDate) -> Result<String, PersistError> {
        match self.store.daily_note_for(date) {
            Some(note) => Ok(note),
            None => self
                .store
                .create_daily_note(date)
                .map_err(|source| PersistError::DailyNote { date, source }),
        }
    }

    fn append(&self, target: &str, line: &str) -> Result<(), PersistError> {
        self.store
            .append(target, &format!("\n{line}"))
            .map_err(|source| PersistError::Write {
                path: target.to_string(),
                source,
            })
    }

    fn ensure_folders(&self, target: &str) -> Result<(), PersistError> {
        for folder in path::ancestors(target) {
            if !self.store.exists(&folder) {
                self.store
                    .create_folder(&folder)
                    .map_err(|source| PersistError::CreateFolder {
                        path: folder.clone(),
                        source,
                    })?;
            }
        }
        Ok(())
    }
}
