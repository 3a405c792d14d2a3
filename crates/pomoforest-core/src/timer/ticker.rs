//! Background tick source.
//!
//! A tokio task that, while armed, sends the clock's monotonic timestamp
//! to a single consumer at a fixed period. The task owns its own timer, so a
//! consumer that is busy (for example appending to a slow file) cannot
//! stretch the period; the engine works from timestamp deltas anyway.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::clock::Clock;

/// Default period between ticks while armed.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Arm/disarm switch the engine uses to control its tick source.
pub trait TickControl: Send + Sync {
    fn arm(&self);
    /// Idempotent.
    fn disarm(&self);
}

/// Cloneable switch for a running [`TickSource`].
#[derive(Debug, Clone)]
pub struct TickHandle {
    armed: Arc<watch::Sender<bool>>,
}

impl TickHandle {
    pub fn is_armed(&self) -> bool {
        *self.armed.borrow()
    }
}

impl TickControl for TickHandle {
    fn arm(&self) {
        self.armed.send_replace(true);
    }

    fn disarm(&self) {
        self.armed.send_replace(false);
    }
}

/// Owns the background tick task. Dropping it stops the task.
#[derive(Debug)]
pub struct TickSource {
    handle: TickHandle,
    task: JoinHandle<()>,
}

impl TickSource {
    /// Spawn the tick task on the current tokio runtime.
    ///
    /// Returns the source together with the receiving end of the tick
    /// channel. The source starts disarmed.
    pub fn spawn(
        period: Duration,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::UnboundedReceiver<u64>) {
        let (armed_tx, armed_rx) = watch::channel(false);
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(period, clock, armed_rx, tick_tx));
        let source = Self {
            handle: TickHandle {
                armed: Arc::new(armed_tx),
            },
            task,
        };
        (source, tick_rx)
    }

    pub fn handle(&self) -> TickHandle {
        self.handle.clone()
    }
}

impl Drop for TickSource {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    period: Duration,
    clock: Arc<dyn Clock>,
    mut armed: watch::Receiver<bool>,
    ticks: mpsc::UnboundedSender<u64>,
) {
    loop {
        if !*armed.borrow_and_update() {
            if armed.changed().await.is_err() {
                return;
            }
            continue;
        }

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; the engine already stamped
        // `last_tick` when it armed us.
        interval.tick().await;

        loop {
            tokio::select! {
                biased;
                changed = armed.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if !*armed.borrow_and_update() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    if ticks.send(clock.now_ms()).is_err() {
                        tracing::debug!("tick consumer dropped, stopping tick source");
                        return;
                    }
                }
            }
        }
    }
}
