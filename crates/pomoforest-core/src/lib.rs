//! # Pomoforest Core Library
//!
//! This library provides the core logic for the Pomoforest Pomodoro timer:
//! a session state machine that logs every completed session into a note
//! vault. The CLI is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine fed by a background
//!   tick source; elapsed time is the sum of tick timestamp deltas
//! - **Session Log**: Templated log lines appended to a daily note or a
//!   fixed file in the vault
//! - **Notifier**: Sound cue and desktop message on completion
//! - **Timer Service**: Single-owner event loop serializing ticks, commands
//!   and settings updates
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerService`]: Owns the engine and dispatches completions
//! - [`LogPersister`]: Writes session lines through a [`FileStore`]
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod log;
pub mod notify;
pub mod service;
pub mod storage;
pub mod timer;
pub mod vault;

pub use error::{ConfigError, CoreError, PersistError, VaultError};
pub use events::Event;
pub use log::{LogPersister, LogSettings, LogTarget, SessionLogRecord, DEFAULT_LOG_TEMPLATE};
pub use notify::{AudioCue, NotificationSink, Notifier};
pub use service::{Command, TimerHandle, TimerService};
pub use storage::{Config, Settings};
pub use timer::{
    Clock, ManualClock, Mode, Remaining, SystemClock, TickControl, TickSource, TimerEngine,
    TimerSettings, TimerState,
};
pub use vault::{DailyNotes, FileStore, FsVault};
