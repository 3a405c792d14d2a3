use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::log::SessionLogRecord;
use crate::timer::{Mode, TimerState};

/// Every state change in the timer produces an Event.
/// The CLI renders them; the service dispatches completions to the
/// persister and notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        mode: Mode,
        duration_min: u64,
        /// True when a paused session was resumed.
        resumed: bool,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: Mode,
        at: DateTime<Utc>,
    },
    /// The current session was ended without completing (explicit toggle).
    ModeToggled {
        mode: Mode,
        duration_min: u64,
        at: DateTime<Utc>,
    },
    /// A session ran to completion.
    SessionCompleted {
        record: SessionLogRecord,
        next_mode: Mode,
        /// The next session was started automatically.
        autostarted: bool,
    },
    /// The completed session's line was written to the vault.
    SessionLogged {
        path: String,
    },
    /// Writing the completed session's line failed. The timer is unaffected.
    SessionLogFailed {
        error: String,
    },
    SettingsApplied {
        /// Lengths will only apply once the active session ends.
        deferred: bool,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        mode: Mode,
        duration_min: u64,
        elapsed_ms: u64,
        remaining_ms: u64,
        remaining: String,
        autostart: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The completed session, if this event carries one.
    pub fn completed_record(&self) -> Option<&SessionLogRecord> {
        match self {
            Event::SessionCompleted { record, .. } => Some(record),
            _ => None,
        }
    }
}
