//! Completion notifications: an audible cue plus a short message.
//!
//! Nothing here may block the caller or surface an error. Desktop and audio
//! failures are logged at debug level and dropped.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::log::SessionLogRecord;

/// Somewhere to show a transient message.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: &str);
}

/// A short sound.
pub trait AudioCue: Send + Sync {
    fn play(&self);
}

/// Desktop notification through the platform notification service.
#[derive(Debug, Clone, Default)]
pub struct DesktopSink;

impl NotificationSink for DesktopSink {
    fn notify(&self, message: &str) {
        let shown = notify_rust::Notification::new()
            .summary("Pomoforest")
            .body(message)
            .appname("pomoforest")
            .icon("alarm-clock")
            .show();
        if let Err(e) = shown {
            tracing::debug!(error = %e, "desktop notification failed");
        }
    }
}

/// Writes the message to stderr.
#[derive(Debug, Clone, Default)]
pub struct StderrSink;

impl NotificationSink for StderrSink {
    fn notify(&self, message: &str) {
        let _ = writeln!(std::io::stderr(), "\n{message}");
    }
}

/// Sends every message to each inner sink.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Box<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

impl NotificationSink for FanoutSink {
    fn notify(&self, message: &str) {
        for sink in &self.sinks {
            sink.notify(message);
        }
    }
}

/// System sound players tried in order, with the file each one plays.
const PLAYERS: &[(&str, &str)] = &[
    ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
    ("aplay", "/usr/share/sounds/sound-icons/guitar-11.wav"),
    ("afplay", "/System/Library/Sounds/Glass.aiff"),
];

/// Plays a bell through a system player on a background thread, falling
/// back to the terminal bell.
#[derive(Debug, Clone, Default)]
pub struct SoundCue {
    custom: Option<PathBuf>,
}

impl SoundCue {
    /// Prefer `custom` when it exists.
    pub fn new(custom: Option<PathBuf>) -> Self {
        Self { custom }
    }
}

impl AudioCue for SoundCue {
    fn play(&self) {
        let custom = self.custom.clone();
        std::thread::spawn(move || {
            if let Some(file) = custom.filter(|f| f.exists()) {
                for (cmd, _) in PLAYERS {
                    if spawn_player(cmd, &file) {
                        return;
                    }
                }
            }
            for (cmd, file) in PLAYERS {
                let file = Path::new(file);
                if file.exists() && spawn_player(cmd, file) {
                    return;
                }
            }
            let _ = std::io::stderr().write_all(b"\x07");
        });
    }
}

fn spawn_player(cmd: &str, file: &Path) -> bool {
    match Command::new(cmd)
        .arg(file)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(player = cmd, error = %e, "sound player unavailable");
            false
        }
    }
}

/// No sound.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentCue;

impl AudioCue for SilentCue {
    fn play(&self) {}
}

/// Rings and shows a message when a session completes.
pub struct Notifier {
    sink: Box<dyn NotificationSink>,
    cue: Box<dyn AudioCue>,
}

impl Notifier {
    pub fn new(sink: Box<dyn NotificationSink>, cue: Box<dyn AudioCue>) -> Self {
        Self { sink, cue }
    }

    pub fn notify_completion(&self, record: &SessionLogRecord) {
        self.cue.play();
        self.sink.notify(&record.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::Mode;
    use chrono::{Local, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<String>>>);

    impl NotificationSink for Captured {
        fn notify(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[derive(Clone, Default)]
    struct CountingCue(Arc<AtomicUsize>);

    impl AudioCue for CountingCue {
        fn play(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn completion_rings_and_notifies_once() {
        let sink = Captured::default();
        let cue = CountingCue::default();
        let notifier = Notifier::new(Box::new(sink.clone()), Box::new(cue.clone()));
        let record = SessionLogRecord::new(
            Mode::Work,
            25,
            Local.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            Local.with_ymd_and_hms(2024, 1, 1, 9, 25, 0).unwrap(),
        );

        notifier.notify_completion(&record);

        assert_eq!(cue.0.load(Ordering::SeqCst), 1);
        assert_eq!(
            *sink.0.lock().unwrap(),
            vec!["🍅 You have been working for 25 minutes.".to_string()]
        );
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let a = Captured::default();
        let b = Captured::default();
        let fanout = FanoutSink::new(vec![Box::new(a.clone()), Box::new(b.clone())]);
        fanout.notify("hi");
        assert_eq!(a.0.lock().unwrap().len(), 1);
        assert_eq!(b.0.lock().unwrap().len(), 1);
    }
}
