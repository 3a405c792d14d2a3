//! `{field}` / `{field|format}` substitution for session log lines.

use std::sync::OnceLock;

use chrono::{DateTime, Local};
use regex::{Captures, Regex};

use super::datefmt::format_datetime;
use super::record::SessionLogRecord;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(.*?)\}").expect("placeholder pattern is valid"))
}

/// A template field resolved against a record.
enum Field<'a> {
    Text(String),
    Time(&'a DateTime<Local>),
    Missing,
}

impl SessionLogRecord {
    fn field(&self, key: &str) -> Field<'_> {
        match key {
            "mode" => Field::Text(self.mode.as_str().to_string()),
            "duration" => Field::Text(self.duration_min.to_string()),
            "begin" => Field::Time(&self.begin),
            "end" => Field::Time(&self.end),
            _ => Field::Missing,
        }
    }

    /// Substitute every placeholder in `template`.
    ///
    /// Never fails: unknown fields, and date formats applied to fields that
    /// are not timestamps, render as the empty string.
    pub fn render(&self, template: &str) -> String {
        placeholder()
            .replace_all(template, |caps: &Captures| {
                let expression = &caps[1];
                let (key, format) = match expression.split_once('|') {
                    Some((key, format)) => (key.trim(), Some(format.trim())),
                    None => (expression.trim(), None),
                };
                let format = format.filter(|f| !f.is_empty());

                match (self.field(key), format) {
                    (Field::Time(t), Some(f)) => format_datetime(t, f),
                    (Field::Time(t), None) => t.to_rfc3339(),
                    (Field::Text(text), None) => text,
                    (Field::Text(_), Some(_)) | (Field::Missing, _) => String::new(),
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::DEFAULT_LOG_TEMPLATE;
    use crate::timer::Mode;
    use chrono::TimeZone;

    fn record(mode: Mode) -> SessionLogRecord {
        SessionLogRecord::new(
            mode,
            25,
            Local.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            Local.with_ymd_and_hms(2024, 1, 1, 9, 25, 0).unwrap(),
        )
    }

    #[test]
    fn renders_fields_and_date_formats() {
        let line = record(Mode::Work).render("{mode} {duration}m {begin|YYYY-MM-DD}");
        assert_eq!(line, "WORK 25m 2024-01-01");
    }

    #[test]
    fn default_template_line() {
        let line = record(Mode::Work).text(DEFAULT_LOG_TEMPLATE);
        assert_eq!(
            line,
            "- 🍅 (pomodoro::WORK) (duration:: 25m) (begin:: 2024-01-01 09:00) - (end:: 2024-01-01 09:25)"
        );
    }

    #[test]
    fn break_uses_its_glyph() {
        assert!(record(Mode::Break).text("{mode}").starts_with("- 🥤 BREAK"));
    }

    #[test]
    fn unknown_fields_render_empty() {
        assert_eq!(record(Mode::Work).render("[{task}]{}"), "[]");
    }

    #[test]
    fn format_on_plain_field_renders_empty() {
        assert_eq!(record(Mode::Work).render("<{duration|YYYY}>"), "<>");
    }

    #[test]
    fn whitespace_around_key_and_format_is_trimmed() {
        assert_eq!(record(Mode::Work).render("{ end | HH:mm }"), "09:25");
    }

    #[test]
    fn timestamp_without_format_is_rfc3339() {
        let r = record(Mode::Work);
        assert_eq!(r.render("{begin}"), r.begin.to_rfc3339());
        assert_eq!(r.render("{begin|}"), r.begin.to_rfc3339());
    }

    #[test]
    fn unclosed_brace_is_left_alone() {
        assert_eq!(record(Mode::Work).render("{mode"), "{mode");
    }

    #[test]
    fn empty_template_keeps_prefix() {
        assert_eq!(record(Mode::Work).text(""), "- 🍅 ");
    }

    #[test]
    fn summary_mentions_activity() {
        assert_eq!(
            record(Mode::Break).summary(),
            "🥤 You have been breaking for 25 minutes."
        );
    }
}
