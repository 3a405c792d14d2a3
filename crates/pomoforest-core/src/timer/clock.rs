//! Time sources for the timer engine and tick source.
//!
//! A clock answers two questions. `now()` is wall time and only labels
//! sessions (start time, log record begin/end). `now_ms()` is a monotonic
//! counter that tick timestamps and the engine's `last_tick` share; only
//! differences between its readings mean anything, so wall-clock steps
//! (NTP, manual changes) never stretch or shrink a session.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Source of "now".
pub trait Clock: Send + Sync {
    /// Wall time.
    fn now(&self) -> DateTime<Local>;

    /// Monotonic milliseconds from an arbitrary, fixed origin.
    fn now_ms(&self) -> u64;
}

/// Wall clock for labels, `Instant` for elapsed time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

fn process_origin() -> Instant {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    *ORIGIN.get_or_init(Instant::now)
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(process_origin().elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A clock that only moves when told to.
///
/// Wall time starts equal to the monotonic counter (read as epoch ms) and
/// follows it, unless shifted with [`shift_wall`](Self::shift_wall).
/// Clones share state, so a test can keep one handle and give another to
/// the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    ms: Arc<AtomicU64>,
    wall_offset_ms: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(ms: u64) -> Self {
        Self {
            ms: Arc::new(AtomicU64::new(ms)),
            wall_offset_ms: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn set(&self, ms: u64) {
        self.ms.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Step wall time by `delta_ms` without moving the monotonic counter.
    pub fn shift_wall(&self, delta_ms: i64) {
        self.wall_offset_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        let ms = i64::try_from(self.now_ms())
            .unwrap_or(i64::MAX)
            .saturating_add(self.wall_offset_ms.load(Ordering::SeqCst));
        Local
            .timestamp_millis_opt(ms)
            .single()
            .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH.with_timezone(&Local))
    }

    fn now_ms(&self) -> u64 {
        self.ms.load(Ordering::SeqCst)
    }
}
