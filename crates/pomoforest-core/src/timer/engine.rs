//! Timer engine implementation.
//!
//! The timer engine is a state machine over monotonic timestamps. It does
//! not own a thread: ticks arrive from a [`TickSource`](super::TickSource)
//! (or a test) through `tick()`, and elapsed time is the sum of timestamp
//! deltas, so dropped or late ticks never distort it. Wall time is read only
//! to label the session.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!   ^        |          |
//!   +--------+----------+  (reset, toggle_mode, completion)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(settings, clock, ticks);
//! engine.start();
//! // For every tick timestamp:
//! if let Some(event) = engine.tick(t) { /* session completed */ }
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::mode::{minutes_to_ms, Mode, TimerSettings};
use super::ticker::TickControl;
use crate::events::Event;
use crate::log::SessionLogRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    /// No session in progress.
    Idle,
    Running,
    /// In session, but ticks do not advance elapsed time.
    Paused,
}

/// Time left in the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remaining {
    pub millis: u64,
    /// `MM:SS`, minutes and seconds floored and zero-padded.
    pub human: String,
}

impl Remaining {
    pub fn from_millis(millis: u64) -> Self {
        let min = millis / 60_000;
        let sec = (millis % 60_000) / 1000;
        Self {
            millis,
            human: format!("{min:02}:{sec:02}"),
        }
    }
}

/// Core timer engine.
///
/// Single owner of the session record. Every mutation goes through one of
/// the `&mut self` commands below; the caller serializes them.
pub struct TimerEngine {
    mode: Mode,
    settings: TimerSettings,
    /// Minutes allotted to the current session, frozen at session start.
    duration_min: u64,
    /// `duration_min` in milliseconds.
    count_ms: u64,
    elapsed_ms: u64,
    last_tick_ms: u64,
    start_time: Option<DateTime<Local>>,
    running: bool,
    in_session: bool,
    clock: Arc<dyn Clock>,
    ticks: Box<dyn TickControl>,
}

impl fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEngine")
            .field("mode", &self.mode)
            .field("settings", &self.settings)
            .field("duration_min", &self.duration_min)
            .field("count_ms", &self.count_ms)
            .field("elapsed_ms", &self.elapsed_ms)
            .field("last_tick_ms", &self.last_tick_ms)
            .field("start_time", &self.start_time)
            .field("running", &self.running)
            .field("in_session", &self.in_session)
            .finish_non_exhaustive()
    }
}

impl TimerEngine {
    /// Create an idle engine in `Work` mode.
    pub fn new(
        settings: TimerSettings,
        clock: Arc<dyn Clock>,
        ticks: Box<dyn TickControl>,
    ) -> Self {
        let mut engine = Self {
            mode: Mode::Work,
            settings,
            duration_min: 0,
            count_ms: 0,
            elapsed_ms: 0,
            last_tick_ms: 0,
            start_time: None,
            running: false,
            in_session: false,
            clock,
            ticks,
        };
        engine.recompute_duration();
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        match (self.in_session, self.running) {
            (false, _) => TimerState::Idle,
            (true, true) => TimerState::Running,
            (true, false) => TimerState::Paused,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn settings(&self) -> TimerSettings {
        self.settings
    }

    pub fn duration_min(&self) -> u64 {
        self.duration_min
    }

    pub fn count_ms(&self) -> u64 {
        self.count_ms
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn start_time(&self) -> Option<DateTime<Local>> {
        self.start_time
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn in_session(&self) -> bool {
        self.in_session
    }

    /// Time left, derived from the current state on every call.
    pub fn remaining(&self) -> Remaining {
        Remaining::from_millis(self.count_ms.saturating_sub(self.elapsed_ms))
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let remaining = self.remaining();
        Event::StateSnapshot {
            state: self.state(),
            mode: self.mode,
            duration_min: self.duration_min,
            elapsed_ms: self.elapsed_ms,
            remaining_ms: remaining.millis,
            remaining: remaining.human,
            autostart: self.settings.autostart,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a fresh session, or resume a paused one.
    ///
    /// Returns `None` when already running.
    pub fn start(&mut self) -> Option<Event> {
        if self.running {
            return None;
        }
        let now = self.clock.now();
        let resumed = self.in_session;
        if !resumed {
            self.elapsed_ms = 0;
            self.recompute_duration();
            self.start_time = Some(now);
        }
        self.last_tick_ms = self.clock.now_ms();
        self.in_session = true;
        self.running = true;
        self.ticks.arm();
        tracing::debug!(
            mode = %self.mode,
            duration_min = self.duration_min,
            resumed,
            "timer started"
        );
        Some(Event::TimerStarted {
            mode: self.mode,
            duration_min: self.duration_min,
            resumed,
            at: now.with_timezone(&Utc),
        })
    }

    /// Stop advancing elapsed time. The session stays open.
    pub fn pause(&mut self) -> Option<Event> {
        self.ticks.disarm();
        if !self.running {
            return None;
        }
        self.running = false;
        tracing::debug!(elapsed_ms = self.elapsed_ms, "timer paused");
        Some(Event::TimerPaused {
            remaining_ms: self.remaining().millis,
            at: Utc::now(),
        })
    }

    /// Abandon the current session and return to idle, keeping the mode.
    pub fn reset(&mut self) -> Option<Event> {
        self.recompute_duration();
        self.in_session = false;
        self.running = false;
        self.ticks.disarm();
        self.start_time = None;
        self.elapsed_ms = 0;
        tracing::debug!(mode = %self.mode, "timer reset");
        Some(Event::TimerReset {
            mode: self.mode,
            at: Utc::now(),
        })
    }

    pub fn toggle_timer(&mut self) -> Option<Event> {
        if self.running {
            self.pause()
        } else {
            self.start()
        }
    }

    /// End the current session without logging it and switch modes.
    pub fn toggle_mode(&mut self) -> Option<Event> {
        self.end_session();
        Some(Event::ModeToggled {
            mode: self.mode,
            duration_min: self.duration_min,
            at: Utc::now(),
        })
    }

    /// Apply a tick timestamp (epoch ms).
    ///
    /// Ignored unless running: a tick queued before a pause must not move
    /// elapsed time. Returns `Some(Event::SessionCompleted)` when the
    /// session finishes.
    pub fn tick(&mut self, t: u64) -> Option<Event> {
        if !self.running {
            return None;
        }
        let delta = t.saturating_sub(self.last_tick_ms);
        self.last_tick_ms = self.last_tick_ms.max(t);
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta).min(self.count_ms);
        if self.elapsed_ms == self.count_ms {
            return Some(self.timeup());
        }
        None
    }

    /// Complete the current session.
    ///
    /// Builds the log record, ends the session and, with autostart on,
    /// starts the next one immediately.
    pub fn timeup(&mut self) -> Event {
        let end = self.clock.now();
        let record = SessionLogRecord::new(
            self.mode,
            self.duration_min,
            self.start_time.unwrap_or(end),
            end,
        );
        let autostart = self.settings.autostart;
        self.end_session();
        if autostart {
            self.start();
        }
        tracing::info!(
            mode = %record.mode,
            duration_min = record.duration_min,
            next = %self.mode,
            autostart,
            "session completed"
        );
        Event::SessionCompleted {
            record,
            next_mode: self.mode,
            autostarted: autostart,
        }
    }

    /// Store new settings.
    ///
    /// Lengths only feed `duration`/`count` while idle; an open session
    /// keeps the values it started with.
    pub fn apply_settings(&mut self, settings: TimerSettings) -> Option<Event> {
        self.settings = settings;
        let deferred = self.running || self.in_session;
        if !deferred {
            self.recompute_duration();
        }
        tracing::debug!(?settings, deferred, "settings applied");
        Some(Event::SettingsApplied {
            deferred,
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn end_session(&mut self) {
        self.mode = self.mode.next(self.settings.break_len);
        self.recompute_duration();
        self.in_session = false;
        self.running = false;
        self.ticks.disarm();
        self.start_time = None;
        self.elapsed_ms = 0;
    }

    fn recompute_duration(&mut self) {
        self.duration_min = self.settings.duration_for(self.mode);
        self.count_ms = minutes_to_ms(self.duration_min);
    }
}
