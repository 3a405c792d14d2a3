use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::timer::Mode;

/// Template used when the configuration does not provide one.
pub const DEFAULT_LOG_TEMPLATE: &str =
    "(pomodoro::{mode}) (duration:: {duration}m) (begin:: {begin|YYYY-MM-DD HH:mm}) - (end:: {end|YYYY-MM-DD HH:mm})";

/// One completed session.
///
/// Built by the engine the moment a session completes, rendered and
/// persisted once, then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLogRecord {
    pub mode: Mode,
    /// Session length in minutes.
    pub duration_min: u64,
    pub begin: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl SessionLogRecord {
    pub fn new(
        mode: Mode,
        duration_min: u64,
        begin: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Self {
        Self {
            mode,
            duration_min,
            begin,
            end,
        }
    }

    /// The full log line: `- <glyph> <rendered template>`.
    pub fn text(&self, template: &str) -> String {
        format!("- {} {}", self.mode.glyph(), self.render(template))
    }

    /// Message shown when the session completes.
    pub fn summary(&self) -> String {
        format!(
            "{} You have been {} for {} minutes.",
            self.mode.glyph(),
            self.mode.activity(),
            self.duration_min
        )
    }
}
