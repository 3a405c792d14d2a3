use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of session the timer is counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Work,
    Break,
}

impl Mode {
    /// Glyph prefixed to log lines and notifications.
    pub fn glyph(self) -> &'static str {
        match self {
            Mode::Work => "🍅",
            Mode::Break => "🥤",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Work => "WORK",
            Mode::Break => "BREAK",
        }
    }

    /// Verb used in the completion notification ("You have been working...").
    pub fn activity(self) -> &'static str {
        match self {
            Mode::Work => "working",
            Mode::Break => "breaking",
        }
    }

    /// The mode that follows this one when a session ends.
    ///
    /// A zero-length break disables breaks entirely, so the timer stays in
    /// `Work`.
    pub fn next(self, break_len: u64) -> Mode {
        if break_len == 0 {
            return Mode::Work;
        }
        match self {
            Mode::Work => Mode::Break,
            Mode::Break => Mode::Work,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(Mode::Work),
            "break" => Ok(Mode::Break),
            other => Err(format!("unknown mode '{other}' (expected work or break)")),
        }
    }
}

/// Timer lengths and autostart flag supplied by the settings provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    /// Work session length in minutes.
    pub work_len: u64,
    /// Break length in minutes. Zero disables breaks.
    pub break_len: u64,
    pub autostart: bool,
}

impl TimerSettings {
    /// Minutes allotted to a session in `mode`.
    pub fn duration_for(&self, mode: Mode) -> u64 {
        match mode {
            Mode::Work => self.work_len,
            Mode::Break => self.break_len,
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_len: 25,
            break_len: 5,
            autostart: false,
        }
    }
}

/// Convert minutes to milliseconds.
///
/// Uses saturating arithmetic so absurd settings cannot overflow.
pub fn minutes_to_ms(minutes: u64) -> u64 {
    minutes.saturating_mul(60).saturating_mul(1000)
}
