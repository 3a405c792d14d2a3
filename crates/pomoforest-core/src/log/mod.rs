//! Session log: the record of a completed session, its text rendering, and
//! persistence into the vault.

pub mod datefmt;
mod persister;
mod record;
mod template;

pub use persister::{LogPersister, LogSettings, LogTarget};
pub use record::{SessionLogRecord, DEFAULT_LOG_TEMPLATE};
