//! Timer service: the single owner of the [`TimerEngine`].
//!
//! One tokio task selects over tick timestamps, user commands and settings
//! updates, so engine transitions never interleave. Completed sessions are
//! handed off without waiting: the log line goes to a dedicated writer
//! thread (lines stay in completion order) and the notification runs on
//! the blocking pool. Shutting down drains the writer before `run` returns.

use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::log::{LogPersister, LogSettings, SessionLogRecord};
use crate::notify::Notifier;
use crate::storage::Settings;
use crate::timer::{Clock, Remaining, TickSource, TimerEngine};

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 64;

/// Requests accepted by the service.
#[derive(Debug)]
pub enum Command {
    Start,
    Pause,
    Reset,
    ToggleTimer,
    ToggleMode,
    Snapshot(oneshot::Sender<Event>),
    Remaining(oneshot::Sender<Remaining>),
    Shutdown,
}

/// Cloneable front end to a running [`TimerService`].
#[derive(Debug, Clone)]
pub struct TimerHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<Event>,
}

impl TimerHandle {
    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::ServiceClosed)
    }

    pub async fn start(&self) -> Result<()> {
        self.send(Command::Start).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(Command::Reset).await
    }

    pub async fn toggle_timer(&self) -> Result<()> {
        self.send(Command::ToggleTimer).await
    }

    pub async fn toggle_mode(&self) -> Result<()> {
        self.send(Command::ToggleMode).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    pub async fn snapshot(&self) -> Result<Event> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| CoreError::ServiceClosed)
    }

    pub async fn remaining(&self) -> Result<Remaining> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Remaining(tx)).await?;
        rx.await.map_err(|_| CoreError::ServiceClosed)
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}

struct LogJob {
    record: SessionLogRecord,
    settings: LogSettings,
}

/// Owns the engine, its tick source and the completion hand-off.
pub struct TimerService {
    engine: TimerEngine,
    _ticker: TickSource,
    ticks: mpsc::UnboundedReceiver<u64>,
    commands: mpsc::Receiver<Command>,
    settings: watch::Receiver<Settings>,
    log_settings: LogSettings,
    log_jobs: std_mpsc::Sender<LogJob>,
    log_writer: Option<thread::JoinHandle<()>>,
    notifier: Arc<Notifier>,
    events: broadcast::Sender<Event>,
}

impl TimerService {
    /// Build the service and its handle.
    ///
    /// Must be called from within a tokio runtime; the tick source is
    /// spawned immediately (disarmed).
    pub fn new(
        settings: watch::Receiver<Settings>,
        persister: LogPersister,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
        tick_interval: Duration,
    ) -> (Self, TimerHandle) {
        let (ticker, ticks) = TickSource::spawn(tick_interval, clock.clone());
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let current = settings.borrow().clone();
        let engine = TimerEngine::new(current.timer, clock, Box::new(ticker.handle()));
        let (log_jobs, log_writer) = spawn_log_writer(persister, events.clone());

        let service = Self {
            engine,
            _ticker: ticker,
            ticks,
            commands,
            settings,
            log_settings: current.log,
            log_jobs,
            log_writer,
            notifier: Arc::new(notifier),
            events: events.clone(),
        };
        let handle = TimerHandle {
            commands: command_tx,
            events,
        };
        (service, handle)
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process events until shut down or every handle is dropped.
    ///
    /// Returns once every queued session line has been written.
    pub async fn run(mut self) {
        let mut settings_open = true;
        loop {
            tokio::select! {
                Some(t) = self.ticks.recv() => {
                    let event = self.engine.tick(t);
                    self.emit(event);
                }
                command = self.commands.recv() => match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => self.handle(command),
                },
                changed = self.settings.changed(), if settings_open => {
                    if changed.is_err() {
                        tracing::debug!("settings provider closed; keeping last settings");
                        settings_open = false;
                        continue;
                    }
                    let settings = self.settings.borrow_and_update().clone();
                    self.log_settings = settings.log;
                    let event = self.engine.apply_settings(settings.timer);
                    self.emit(event);
                }
            }
        }
        self.engine.pause();
        self.drain_log_writer().await;
        tracing::debug!("timer service stopped");
    }

    async fn drain_log_writer(self) {
        let Self {
            log_jobs,
            log_writer,
            ..
        } = self;
        // Closing the queue ends the writer loop after the last job.
        drop(log_jobs);
        let Some(writer) = log_writer else {
            return;
        };
        match tokio::task::spawn_blocking(move || writer.join()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => tracing::warn!("session log writer panicked"),
            Err(e) => tracing::warn!(error = %e, "could not wait for session log writer"),
        }
    }

    fn handle(&mut self, command: Command) {
        let event = match command {
            Command::Start => self.engine.start(),
            Command::Pause => self.engine.pause(),
            Command::Reset => self.engine.reset(),
            Command::ToggleTimer => self.engine.toggle_timer(),
            Command::ToggleMode => self.engine.toggle_mode(),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.engine.snapshot());
                None
            }
            Command::Remaining(reply) => {
                let _ = reply.send(self.engine.remaining());
                None
            }
            Command::Shutdown => None,
        };
        self.emit(event);
    }

    fn emit(&self, event: Option<Event>) {
        let Some(event) = event else {
            return;
        };
        if let Some(record) = event.completed_record() {
            self.dispatch_completion(record);
        }
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn dispatch_completion(&self, record: &SessionLogRecord) {
        let notifier = self.notifier.clone();
        let notified = record.clone();
        tokio::task::spawn_blocking(move || notifier.notify_completion(&notified));

        let job = LogJob {
            record: record.clone(),
            settings: self.log_settings.clone(),
        };
        if self.log_jobs.send(job).is_err() {
            tracing::warn!("session log writer is gone; dropping log line");
        }
    }
}

fn spawn_log_writer(
    persister: LogPersister,
    events: broadcast::Sender<Event>,
) -> (std_mpsc::Sender<LogJob>, Option<thread::JoinHandle<()>>) {
    let (tx, rx) = std_mpsc::channel::<LogJob>();
    let spawned = thread::Builder::new()
        .name("pomoforest-log".into())
        .spawn(move || {
            for LogJob { record, settings } in rx {
                let line = record.text(&settings.template);
                let event = match persister.save(&line, &settings, record.end.date_naive()) {
                    Ok(Some(path)) => {
                        tracing::info!(%path, "session logged");
                        Event::SessionLogged { path }
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to persist session log");
                        Event::SessionLogFailed {
                            error: e.to_string(),
                        }
                    }
                };
                let _ = events.send(event);
            }
        });
    match spawned {
        Ok(writer) => (tx, Some(writer)),
        Err(e) => {
            tracing::warn!(
                error = %e,
                "cannot start session log writer; sessions will not be logged"
            );
            (tx, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VaultError;
    use crate::log::LogTarget;
    use crate::notify::{SilentCue, StderrSink};
    use crate::timer::{ManualClock, Mode, TimerSettings, TimerState};
    use crate::vault::{DailyNotes, FileStore, FsVault};
    use chrono::NaiveDate;

    const TICK: Duration = Duration::from_millis(5);
    const WAIT: Duration = Duration::from_secs(5);

    struct Harness {
        handle: TimerHandle,
        task: JoinHandle<()>,
        clock: ManualClock,
        settings: watch::Sender<Settings>,
        vault: Arc<FsVault>,
        _dir: tempfile::TempDir,
    }

    /// Delegates to a real vault after a delay on every write.
    struct SlowStore {
        inner: Arc<FsVault>,
        delay: Duration,
    }

    impl FileStore for SlowStore {
        fn exists(&self, path: &str) -> bool {
            self.inner.exists(path)
        }

        fn read(&self, path: &str) -> std::result::Result<String, VaultError> {
            self.inner.read(path)
        }

        fn append(&self, path: &str, content: &str) -> std::result::Result<(), VaultError> {
            thread::sleep(self.delay);
            self.inner.append(path, content)
        }

        fn create(&self, path: &str, content: &str) -> std::result::Result<(), VaultError> {
            thread::sleep(self.delay);
            self.inner.create(path, content)
        }

        fn create_folder(&self, path: &str) -> std::result::Result<(), VaultError> {
            self.inner.create_folder(path)
        }

        fn daily_note_for(&self, date: NaiveDate) -> Option<String> {
            self.inner.daily_note_for(date)
        }

        fn create_daily_note(&self, date: NaiveDate) -> std::result::Result<String, VaultError> {
            self.inner.create_daily_note(date)
        }
    }

    fn harness(timer: TimerSettings, log: LogSettings) -> Harness {
        harness_with(timer, log, None)
    }

    fn harness_with(
        timer: TimerSettings,
        log: LogSettings,
        write_delay: Option<Duration>,
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(FsVault::new(dir.path(), DailyNotes::default()));
        let store: Arc<dyn FileStore> = match write_delay {
            Some(delay) => Arc::new(SlowStore {
                inner: vault.clone(),
                delay,
            }),
            None => vault.clone(),
        };
        let clock = ManualClock::new(0);
        let (settings_tx, settings_rx) = watch::channel(Settings { timer, log });
        let (service, handle) = TimerService::new(
            settings_rx,
            LogPersister::new(store),
            Notifier::new(Box::new(StderrSink), Box::new(SilentCue)),
            Arc::new(clock.clone()),
            TICK,
        );
        let task = service.spawn();
        Harness {
            handle,
            task,
            clock,
            settings: settings_tx,
            vault,
            _dir: dir,
        }
    }

    async fn next_matching(
        rx: &mut broadcast::Receiver<Event>,
        pred: impl Fn(&Event) -> bool,
    ) -> Event {
        tokio::time::timeout(WAIT, async {
            loop {
                match rx.recv().await {
                    Ok(event) if pred(&event) => return event,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    /// Start and wait until the engine has stamped its first tick, so a
    /// clock change made afterwards is counted.
    async fn start_session(h: &Harness, events: &mut broadcast::Receiver<Event>) {
        h.handle.start().await.unwrap();
        next_matching(events, |e| matches!(e, Event::TimerStarted { .. })).await;
    }

    fn one_minute(autostart: bool) -> TimerSettings {
        TimerSettings {
            work_len: 1,
            break_len: 1,
            autostart,
        }
    }

    fn fixed_file(path: &str, template: &str) -> LogSettings {
        LogSettings {
            target: LogTarget::File,
            path: path.into(),
            template: template.into(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn completion_is_logged_to_fixed_file() {
        let h = harness(one_minute(false), fixed_file("logs/pomodoro.md", "{mode} {duration}m"));
        let mut events = h.handle.subscribe();

        start_session(&h, &mut events).await;
        h.clock.advance(60_000);

        let done =
            next_matching(&mut events, |e| matches!(e, Event::SessionCompleted { .. })).await;
        assert_eq!(done.completed_record().map(|r| r.mode), Some(Mode::Work));

        match next_matching(&mut events, |e| matches!(e, Event::SessionLogged { .. })).await {
            Event::SessionLogged { path } => assert_eq!(path, "logs/pomodoro.md"),
            other => panic!("Expected SessionLogged, got {other:?}"),
        }
        assert_eq!(h.vault.read("logs/pomodoro.md").unwrap(), "- 🍅 WORK 1m");

        match h.handle.snapshot().await.unwrap() {
            Event::StateSnapshot { state, mode, .. } => {
                assert_eq!(state, TimerState::Idle);
                assert_eq!(mode, Mode::Break);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_waits_for_pending_log_line() {
        let h = harness_with(
            one_minute(false),
            fixed_file("log.md", "{mode}"),
            Some(Duration::from_millis(300)),
        );
        let mut events = h.handle.subscribe();

        start_session(&h, &mut events).await;
        h.clock.advance(60_000);
        next_matching(&mut events, |e| matches!(e, Event::SessionCompleted { .. })).await;

        h.handle.shutdown().await.unwrap();
        tokio::time::timeout(WAIT, h.task)
            .await
            .expect("service did not stop")
            .unwrap();
        assert_eq!(h.vault.read("log.md").unwrap(), "- 🍅 WORK");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn autostart_runs_next_session() {
        let h = harness(one_minute(true), LogSettings::default());
        let mut events = h.handle.subscribe();

        start_session(&h, &mut events).await;
        h.clock.advance(60_000);
        next_matching(&mut events, |e| matches!(e, Event::SessionCompleted { .. })).await;

        match h.handle.snapshot().await.unwrap() {
            Event::StateSnapshot { state, mode, .. } => {
                assert_eq!(state, TimerState::Running);
                assert_eq!(mode, Mode::Break);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn paused_session_ignores_clock() {
        let h = harness(one_minute(false), LogSettings::default());
        let mut events = h.handle.subscribe();
        start_session(&h, &mut events).await;
        h.handle.pause().await.unwrap();
        next_matching(&mut events, |e| matches!(e, Event::TimerPaused { .. })).await;

        h.clock.advance(10 * 60_000);
        tokio::time::sleep(TICK * 10).await;

        let remaining = h.handle.remaining().await.unwrap();
        assert_eq!(remaining.millis, 60_000);
        assert_eq!(remaining.human, "01:00");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn settings_update_waits_for_idle() {
        let h = harness(TimerSettings::default(), LogSettings::default());
        let mut events = h.handle.subscribe();
        start_session(&h, &mut events).await;

        h.settings.send_modify(|s| s.timer.work_len = 50);
        match next_matching(&mut events, |e| matches!(e, Event::SettingsApplied { .. })).await {
            Event::SettingsApplied { deferred, .. } => assert!(deferred),
            other => panic!("Expected SettingsApplied, got {other:?}"),
        }
        assert_eq!(h.handle.remaining().await.unwrap().millis, 25 * 60_000);

        h.handle.reset().await.unwrap();
        assert_eq!(h.handle.remaining().await.unwrap().millis, 50 * 60_000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn persistence_failure_does_not_block_timer() {
        // A file where a folder is expected.
        let h = harness(one_minute(false), fixed_file("blocker/log.md", "{mode}"));
        h.vault.create("blocker", "not a folder").unwrap();
        let mut events = h.handle.subscribe();

        start_session(&h, &mut events).await;
        h.clock.advance(60_000);
        next_matching(&mut events, |e| matches!(e, Event::SessionLogFailed { .. })).await;

        start_session(&h, &mut events).await;
        match h.handle.snapshot().await.unwrap() {
            Event::StateSnapshot { state, mode, .. } => {
                assert_eq!(state, TimerState::Running);
                assert_eq!(mode, Mode::Break);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_closes_handle() {
        let h = harness(TimerSettings::default(), LogSettings::default());
        h.handle.shutdown().await.unwrap();
        tokio::time::timeout(WAIT, h.task)
            .await
            .expect("service did not stop")
            .unwrap();
        assert!(matches!(h.handle.start().await, Err(CoreError::ServiceClosed)));
    }
}
