//! `{{DATE}}` token resolution.
//!
//! Two grammars are recognized, relative tokens first and formatted
//! tokens second:
//! - `{{DATE}}`, `{{DATE+N}}`, `{{DATE-N}}`
//! - `{{DATE:FORMAT}}`, `{{DATE:FORMAT+N}}`, `{{DATE:FORMAT+-N}}`
//!
//! A malformed offset (`{{DATE+abc}}`) resolves as offset zero.

use log::warn;
use regex::Regex;
use std::sync::LazyLock;
use time::{Duration, OffsetDateTime, format_description, macros::format_description};

static DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{DATE([+-][^}:\r\n]*)?\}\}").expect("valid date regex")
});

static DATE_REGEX_FORMATTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{DATE:([^}\r\n+]*)(\+[^}\r\n]*)?\}\}").expect("valid date format regex")
});

static NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+$").expect("valid number regex"));

/// Source of "now" for date tokens.
pub trait Clock {
    fn now(&self) -> OffsetDateTime;
}

/// Local wall-clock time; falls back to UTC when the local offset cannot
/// be determined.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_local().unwrap_or_else(|err| {
            log::debug!("local offset unavailable, using UTC: {err}");
            OffsetDateTime::now_utc()
        })
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// Replaces every date token in `input`.
pub fn replace_date_in_string(input: &str, clock: &dyn Clock) -> String {
    let now = clock.now();

    let output = replace_tokens(input, &DATE_REGEX, |caps| {
        let offset = caps.get(1).and_then(|m| parse_offset(m.as_str()));
        get_date(now, None, offset)
    });

    replace_tokens(&output, &DATE_REGEX_FORMATTED, |caps| {
        let format = caps.get(1).map_or("", |m| m.as_str());
        let offset = caps.get(2).and_then(|m| parse_offset(m.as_str()));
        get_date(now, Some(format), offset)
    })
}

/// Replaces matches one at a time so each token gets its own offset.
/// Scanning resumes after the inserted text, which never contains a token
/// terminator, so the loop always finishes.
fn replace_tokens(
    input: &str,
    re: &Regex,
    mut render: impl FnMut(&regex::Captures<'_>) -> String,
) -> String {
    let mut output = input.to_string();
    let mut pos = 0;
    while let Some(caps) = re.captures_at(&output, pos) {
        let Some(whole) = caps.get(0) else {
            break;
        };
        let (start, end) = (whole.start(), whole.end());
        let value = render(&caps);
        output.replace_range(start..end, &value);
        pos = start + value.len();
    }
    output
}

/// `+5` -> 5, `-5` / `+-5` -> -5. Anything else is treated as unset.
fn parse_offset(raw: &str) -> Option<i64> {
    let s = raw.strip_prefix('+').unwrap_or(raw).trim();
    if !NUMBER_REGEX.is_match(s) {
        return None;
    }
    s.parse::<i64>().ok()
}

/// Formats `now` shifted by `offset` days, with `YYYY-MM-DD` when no
/// format is given.
pub fn get_date(now: OffsetDateTime, format: Option<&str>, offset: Option<i64>) -> String {
    let shifted = offset
        .and_then(|days| days.checked_mul(86_400))
        .map(Duration::seconds)
        .and_then(|d| now.checked_add(d))
        .unwrap_or(now);

    match format {
        Some(fmt) if !fmt.is_empty() => format_moment(shifted, fmt).unwrap_or_else(|e| {
            warn!("cannot render date format {fmt:?}: {e}");
            default_format(shifted)
        }),
        _ => default_format(shifted),
    }
}

fn default_format(dt: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day]");
    dt.format(&fmt).unwrap_or_else(|_| "1970-01-01".to_string())
}

/// Moment-style tokens, longest first so `YYYY` wins over `YY`.
const MOMENT_TOKENS: &[&str] = &[
    "YYYY", "MMMM", "dddd", "DDDD", "SSS", "YY", "MMM", "Mo", "MM", "DDD", "Do", "DD", "ddd",
    "dd", "HH", "hh", "mm", "ss", "WW", "ZZ", "Q", "M", "D", "d", "E", "H", "h", "m", "s", "A",
    "a", "W", "Z", "X", "x",
];

/// Renders `dt` with a moment.js-style format string by translating it to
/// a `time` format description. Text inside `[...]` is literal; unknown
/// characters pass through.
pub fn format_moment(dt: OffsetDateTime, fmt: &str) -> Result<String, time::error::Error> {
    let mut desc = String::with_capacity(fmt.len() * 4);
    let mut rest = fmt;

    while let Some(ch) = rest.chars().next() {
        if ch == '['
            && let Some(close) = rest.find(']')
        {
            push_literal(&mut desc, &rest[1..close]);
            rest = &rest[close + 1..];
            continue;
        }

        let Some(token) = MOMENT_TOKENS.iter().find(|t| rest.starts_with(**t)) else {
            push_literal(&mut desc, &rest[..ch.len_utf8()]);
            rest = &rest[ch.len_utf8()..];
            continue;
        };
        rest = &rest[token.len()..];

        match *token {
            "YYYY" => desc.push_str("[year]"),
            "YY" => desc.push_str("[year repr:last_two]"),
            "Q" => push_literal(&mut desc, &((u8::from(dt.month()) - 1) / 3 + 1).to_string()),
            "MMMM" => desc.push_str("[month repr:long]"),
            "MMM" => desc.push_str("[month repr:short]"),
            "MM" => desc.push_str("[month]"),
            "Mo" => push_literal(&mut desc, &ordinal(u8::from(dt.month()).into())),
            "M" => desc.push_str("[month padding:none]"),
            "DDDD" => desc.push_str("[ordinal]"),
            "DDD" => desc.push_str("[ordinal padding:none]"),
            "DD" => desc.push_str("[day]"),
            "Do" => push_literal(&mut desc, &ordinal(dt.day().into())),
            "D" => desc.push_str("[day padding:none]"),
            "dddd" => desc.push_str("[weekday repr:long]"),
            "ddd" => desc.push_str("[weekday repr:short]"),
            "dd" => {
                let short = dt.weekday().to_string();
                push_literal(&mut desc, &short[..2]);
            }
            "d" => desc.push_str("[weekday repr:sunday one_indexed:false]"),
            "E" => desc.push_str("[weekday repr:monday]"),
            "HH" => desc.push_str("[hour]"),
            "H" => desc.push_str("[hour padding:none]"),
            "hh" => desc.push_str("[hour repr:12]"),
            "h" => desc.push_str("[hour repr:12 padding:none]"),
            "mm" => desc.push_str("[minute]"),
            "m" => desc.push_str("[minute padding:none]"),
            "ss" => desc.push_str("[second]"),
            "s" => desc.push_str("[second padding:none]"),
            "SSS" => desc.push_str("[subsecond digits:3]"),
            "A" => desc.push_str("[period]"),
            "a" => desc.push_str("[period case:lower]"),
            "WW" => desc.push_str("[week_number repr:iso]"),
            "W" => desc.push_str("[week_number repr:iso padding:none]"),
            "ZZ" => desc.push_str("[offset_hour sign:mandatory][offset_minute]"),
            "Z" => desc.push_str("[offset_hour sign:mandatory]:[offset_minute]"),
            "X" => desc.push_str("[unix_timestamp]"),
            "x" => desc.push_str("[unix_timestamp precision:millisecond]"),
            _ => unreachable!("token list and match arms agree"),
        }
    }

    let items = format_description::parse_borrowed::<1>(&desc)?;
    Ok(dt.format(&items)?)
}

fn push_literal(desc: &mut String, text: &str) {
    desc.push_str(&text.replace('[', "[["));
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
