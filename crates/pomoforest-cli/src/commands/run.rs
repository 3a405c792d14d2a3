use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use clap::Args;
use pomoforest_core::notify::{
    AudioCue, DesktopSink, FanoutSink, NotificationSink, SilentCue, SoundCue, StderrSink,
};
use pomoforest_core::timer::DEFAULT_TICK_INTERVAL;
use pomoforest_core::{
    Config, Event, FsVault, LogPersister, Notifier, Settings, SystemClock, TimerHandle,
    TimerService,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};

/// How often the config file is checked for changes.
const CONFIG_POLL: Duration = Duration::from_secs(2);
const DISPLAY_REFRESH: Duration = Duration::from_secs(1);

const HELP: &str = "commands: [enter]/t toggle, s start, p pause, r reset, m switch mode, q quit";

#[derive(Args)]
pub struct RunArgs {
    /// Work length in minutes (overrides timer.work_len)
    #[arg(long)]
    work: Option<u64>,
    /// Break length in minutes, 0 disables breaks (overrides timer.break_len)
    #[arg(long = "break")]
    break_len: Option<u64>,
    /// Start the next session automatically when one completes
    #[arg(long)]
    autostart: bool,
    /// Wait for a start command instead of starting immediately
    #[arg(long)]
    no_start: bool,
}

impl RunArgs {
    fn settings(&self, config: &Config) -> Settings {
        let mut settings = config.settings();
        if let Some(work) = self.work {
            settings.timer.work_len = work;
        }
        if let Some(break_len) = self.break_len {
            settings.timer.break_len = break_len;
        }
        if self.autostart {
            settings.timer.autostart = true;
        }
        settings
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_timer(args))
}

fn notifier(config: &Config) -> Notifier {
    let sink: Box<dyn NotificationSink> = if config.notifications.enabled {
        Box::new(FanoutSink::new(vec![
            Box::new(DesktopSink),
            Box::new(StderrSink),
        ]))
    } else {
        Box::new(StderrSink)
    };
    let cue: Box<dyn AudioCue> = if config.notifications.sound {
        Box::new(SoundCue::new(
            config.notifications.custom_sound.as_ref().map(PathBuf::from),
        ))
    } else {
        Box::new(SilentCue)
    };
    Notifier::new(sink, cue)
}

async fn run_timer(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let (settings_tx, settings_rx) = watch::channel(args.settings(&config));

    let vault = FsVault::new(config.vault_root(), config.daily_notes());
    tracing::debug!(vault = %vault.root().display(), "using vault");
    let (service, handle) = TimerService::new(
        settings_rx,
        LogPersister::new(Arc::new(vault)),
        notifier(&config),
        Arc::new(SystemClock),
        DEFAULT_TICK_INTERVAL,
    );
    let service_task = service.spawn();
    let no_start = args.no_start;
    let watcher = tokio::spawn(watch_config(args, config, settings_tx));

    let mut events = handle.subscribe();
    if !no_start {
        handle.start().await?;
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut refresh = tokio::time::interval(DISPLAY_REFRESH);

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    if !dispatch(&handle, line.trim()).await? {
                        break;
                    }
                }
                None => stdin_open = false,
            },
            event = events.recv() => match event {
                Ok(event) => report(&event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = refresh.tick() => show_status(&handle).await?,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!();
    let _ = handle.shutdown().await;
    watcher.abort();
    let _ = service_task.await;
    Ok(())
}

/// Apply one input line. Returns `false` to quit.
async fn dispatch(handle: &TimerHandle, input: &str) -> Result<bool, Box<dyn std::error::Error>> {
    match input {
        "" | "t" => handle.toggle_timer().await?,
        "s" => handle.start().await?,
        "p" => handle.pause().await?,
        "r" => handle.reset().await?,
        "m" => handle.toggle_mode().await?,
        "q" => return Ok(false),
        _ => println!("{HELP}"),
    }
    show_status(handle).await?;
    Ok(true)
}

async fn show_status(handle: &TimerHandle) -> Result<(), Box<dyn std::error::Error>> {
    if let Event::StateSnapshot {
        state,
        mode,
        remaining,
        ..
    } = handle.snapshot().await?
    {
        print!("\r{} {:<5} {} [{:?}]   ", mode.glyph(), mode, remaining, state);
        std::io::stdout().flush()?;
    }
    Ok(())
}

fn report(event: &Event) {
    match event {
        Event::SessionCompleted {
            record,
            next_mode,
            autostarted,
        } => {
            println!(
                "\n{} {} session of {}m complete; next: {}{}",
                record.mode.glyph(),
                record.mode,
                record.duration_min,
                next_mode,
                if *autostarted { " (started)" } else { "" }
            );
        }
        Event::SessionLogged { path } => println!("\nlogged to {path}"),
        Event::SessionLogFailed { error } => println!("\ncould not log session: {error}"),
        Event::SettingsApplied { deferred: true, .. } => {
            println!("\nsettings updated; new lengths apply after this session")
        }
        _ => {}
    }
}

/// Config sections that only take effect on the next `run`.
fn startup_only_changes(before: &Config, after: &Config) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if before.vault != after.vault {
        changed.push("vault");
    }
    if before.notifications != after.notifications {
        changed.push("notifications");
    }
    changed
}

/// Re-emit settings whenever the config file changes on disk.
async fn watch_config(args: RunArgs, mut current: Config, settings: watch::Sender<Settings>) {
    let mut last_seen = config_mtime();
    let mut poll = tokio::time::interval(CONFIG_POLL);
    loop {
        poll.tick().await;
        let mtime = config_mtime();
        if mtime == last_seen {
            continue;
        }
        last_seen = mtime;
        match Config::load() {
            Ok(config) => {
                for section in startup_only_changes(&current, &config) {
                    tracing::warn!(
                        section,
                        "config change applies after restarting `pomoforest run`"
                    );
                }
                let next = args.settings(&config);
                current = config;
                settings.send_if_modified(|current| {
                    if *current == next {
                        return false;
                    }
                    *current = next;
                    true
                });
            }
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable config change"),
        }
    }
}

fn config_mtime() -> Option<SystemTime> {
    let path = Config::path().ok()?;
    std::fs::metadata(path).ok()?.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_and_notification_changes_need_restart() {
        let before = Config::default();
        let mut after = before.clone();
        after.timer.work_len = 50;
        after.log.template = "{mode}".into();
        assert!(startup_only_changes(&before, &after).is_empty());

        after.vault.root = "/srv/notes".into();
        after.notifications.sound = false;
        assert_eq!(startup_only_changes(&before, &after), vec!["vault", "notifications"]);
    }
}
