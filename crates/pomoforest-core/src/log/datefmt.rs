//! Moment-style date formatting (`YYYY-MM-DD HH:mm`).
//!
//! Note vaults conventionally name daily notes and write timestamps with
//! moment.js tokens, so templates use them too. Text inside `[...]` is
//! copied verbatim; anything that is not a token is copied as is.

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, Timelike};

/// Longest tokens first so `MMMM` wins over `MM`.
const TOKENS: &[&str] = &[
    "YYYY", "YY", "MMMM", "MMM", "MM", "M", "Do", "DD", "D", "dddd", "ddd", "HH", "H", "hh", "h",
    "mm", "m", "ss", "s", "A", "a", "ZZ", "Z", "X", "x",
];

/// Format a local timestamp.
pub fn format_datetime(dt: &DateTime<Local>, pattern: &str) -> String {
    render(&dt.naive_local(), Some(dt.offset().fix()), pattern)
}

/// Format a calendar date; time tokens render as midnight, zone tokens as
/// empty.
pub fn format_date(date: NaiveDate, pattern: &str) -> String {
    render(&date.and_time(chrono::NaiveTime::MIN), None, pattern)
}

fn render(dt: &NaiveDateTime, offset: Option<FixedOffset>, pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;

    while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(close) = rest.find(']') {
                out.push_str(&rest[1..close]);
                rest = &rest[close + 1..];
                continue;
            }
        }
        if let Some(token) = TOKENS.iter().find(|t| rest.starts_with(*t)) {
            out.push_str(&token_value(dt, offset, token));
            rest = &rest[token.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn token_value(dt: &NaiveDateTime, offset: Option<FixedOffset>, token: &str) -> String {
    let hour12 = match dt.hour() % 12 {
        0 => 12,
        h => h,
    };
    match token {
        "YYYY" => format!("{:04}", dt.year()),
        "YY" => format!("{:02}", dt.year().rem_euclid(100)),
        "MMMM" => dt.format("%B").to_string(),
        "MMM" => dt.format("%b").to_string(),
        "MM" => format!("{:02}", dt.month()),
        "M" => dt.month().to_string(),
        "Do" => ordinal(dt.day()),
        "DD" => format!("{:02}", dt.day()),
        "D" => dt.day().to_string(),
        "dddd" => dt.format("%A").to_string(),
        "ddd" => dt.format("%a").to_string(),
        "HH" => format!("{:02}", dt.hour()),
        "H" => dt.hour().to_string(),
        "hh" => format!("{hour12:02}"),
        "h" => hour12.to_string(),
        "mm" => format!("{:02}", dt.minute()),
        "m" => dt.minute().to_string(),
        "ss" => format!("{:02}", dt.second()),
        "s" => dt.second().to_string(),
        "A" => if dt.hour() < 12 { "AM" } else { "PM" }.to_string(),
        "a" => if dt.hour() < 12 { "am" } else { "pm" }.to_string(),
        "ZZ" => offset.map(|o| zone(o, false)).unwrap_or_default(),
        "Z" => offset.map(|o| zone(o, true)).unwrap_or_default(),
        "X" => utc_millis(dt, offset).div_euclid(1000).to_string(),
        "x" => utc_millis(dt, offset).to_string(),
        _ => String::new(),
    }
}

fn ordinal(day: u32) -> String {
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{day}{suffix}")
}

fn zone(offset: FixedOffset, colon: bool) -> String {
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    let (h, m) = (secs / 3600, (secs % 3600) / 60);
    if colon {
        format!("{sign}{h:02}:{m:02}")
    } else {
        format!("{sign}{h:02}{m:02}")
    }
}

fn utc_millis(dt: &NaiveDateTime, offset: Option<FixedOffset>) -> i64 {
    let shift = offset.map(|o| i64::from(o.local_minus_utc()) * 1000).unwrap_or(0);
    dt.and_utc().timestamp_millis() - shift
}
