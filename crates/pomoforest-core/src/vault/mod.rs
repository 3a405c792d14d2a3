//! Note vault access.
//!
//! The session log persister only talks to a [`FileStore`]. [`FsVault`]
//! implements it over a directory of Markdown notes, including daily notes
//! named with a moment-style date format.

pub mod path;

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::error::VaultError;
use crate::log::datefmt::format_date;

/// File operations the session log needs from the host.
///
/// Paths are vault-relative and `/`-separated.
pub trait FileStore: Send + Sync {
    fn exists(&self, path: &str) -> bool;
    fn read(&self, path: &str) -> Result<String, VaultError>;
    /// Append to a file, creating it when missing.
    fn append(&self, path: &str, content: &str) -> Result<(), VaultError>;
    /// Create a new file. Fails if it already exists.
    fn create(&self, path: &str, content: &str) -> Result<(), VaultError>;
    fn create_folder(&self, path: &str) -> Result<(), VaultError>;
    /// Path of the daily note for `date`, if it exists.
    fn daily_note_for(&self, date: NaiveDate) -> Option<String>;
    /// Create the daily note for `date` and return its path.
    fn create_daily_note(&self, date: NaiveDate) -> Result<String, VaultError>;
}

/// How daily notes are laid out in the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyNotes {
    /// Folder holding daily notes; empty for the vault root.
    pub folder: String,
    /// Moment-style file name format, without extension.
    pub format: String,
    /// Note whose contents seed a new daily note; empty for none.
    pub template: String,
}

impl Default for DailyNotes {
    fn default() -> Self {
        Self {
            folder: String::new(),
            format: "YYYY-MM-DD".into(),
            template: String::new(),
        }
    }
}

impl DailyNotes {
    pub fn path_for(&self, date: NaiveDate) -> String {
        let name = format!("{}.md", format_date(date, &self.format));
        path::join(&[self.folder.as_str(), name.as_str()])
    }
}

/// A vault rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
    daily: DailyNotes,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>, daily: DailyNotes) -> Self {
        Self {
            root: root.into(),
            daily,
        }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path::normalize(path).trim_start_matches('/'))
    }
}

impl FileStore for FsVault {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    fn read(&self, path: &str) -> Result<String, VaultError> {
        fs::read_to_string(self.resolve(path)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => VaultError::NotFound(path.to_string()),
            _ => VaultError::io("read", path, e),
        })
    }

    fn append(&self, path: &str, content: &str) -> Result<(), VaultError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.resolve(path))
            .map_err(|e| VaultError::io("append", path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| VaultError::io("append", path, e))
    }

    fn create(&self, path: &str, content: &str) -> Result<(), VaultError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.resolve(path))
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => VaultError::AlreadyExists(path.to_string()),
                _ => VaultError::io("create", path, e),
            })?;
        file.write_all(content.as_bytes())
            .map_err(|e| VaultError::io("create", path, e))
    }

    fn create_folder(&self, path: &str) -> Result<(), VaultError> {
        fs::create_dir(self.resolve(path)).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => VaultError::AlreadyExists(path.to_string()),
            _ => VaultError::io("create folder", path, e),
        })
    }

    fn daily_note_for(&self, date: NaiveDate) -> Option<String> {
        let note = self.daily.path_for(date);
        self.exists(&note).then_some(note)
    }

    fn create_daily_note(&self, date: NaiveDate) -> Result<String, VaultError> {
        let note = self.daily.path_for(date);
        for folder in path::ancestors(&note) {
            if !self.exists(&folder) {
                self.create_folder(&folder)?;
            }
        }
        let seed = match self.daily.template.trim() {
            "" => String::new(),
            template => {
                let template = path::normalize(template);
                if template.ends_with(".md") {
                    self.read(&template)?
                } else {
                    self.read(&format!("{template}.md"))?
                }
            }
        };
        self.create(&note, &seed)?;
        tracing::debug!(%note, "created daily note");
        Ok(note)
    }
}
