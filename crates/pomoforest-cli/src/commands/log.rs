use std::sync::Arc;

use chrono::{Duration, Local};
use clap::{Args, Subcommand};
use pomoforest_core::{Config, FsVault, LogPersister, Mode, SessionLogRecord};

#[derive(Args)]
pub struct SampleArgs {
    /// Session mode (work or break)
    #[arg(long, default_value = "work")]
    mode: Mode,
    /// Session length in minutes
    #[arg(long, default_value = "25")]
    duration: u64,
    /// Template to render instead of the configured one
    #[arg(long)]
    template: Option<String>,
}

#[derive(Subcommand)]
pub enum LogAction {
    /// Print the log line a session ending now would produce
    Preview(SampleArgs),
    /// Write a sample session line using the configured target
    Write(SampleArgs),
}

impl SampleArgs {
    fn record(&self) -> SessionLogRecord {
        let end = Local::now();
        let minutes = i64::try_from(self.duration).unwrap_or(i64::MAX);
        let begin = end - Duration::try_minutes(minutes).unwrap_or(Duration::zero());
        SessionLogRecord::new(self.mode, self.duration, begin, end)
    }
}

pub fn run(action: LogAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    match action {
        LogAction::Preview(args) => {
            let template = args.template.as_deref().unwrap_or(&config.log.template);
            println!("{}", args.record().text(template));
        }
        LogAction::Write(args) => {
            let mut settings = config.settings().log;
            if let Some(template) = &args.template {
                settings.template = template.clone();
            }
            let record = args.record();
            let vault = FsVault::new(config.vault_root(), config.daily_notes());
            let persister = LogPersister::new(Arc::new(vault));
            let line = record.text(&settings.template);
            match persister.save(&line, &settings, record.end.date_naive())? {
                Some(path) => println!("logged to {path}"),
                None => println!("session logging is disabled (log.target = none)"),
            }
        }
    }
    Ok(())
}
