mod clock;
mod engine;
mod mode;
mod ticker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Remaining, TimerEngine, TimerState};
pub use mode::{minutes_to_ms, Mode, TimerSettings};
pub use ticker::{TickControl, TickHandle, TickSource, DEFAULT_TICK_INTERVAL};
