//! Value parsers for date/time, duration and offset strings (RFC 5545 §3.3).
//!
//! Failures here are [`RfcError::ValueFormatError`]s: they concern one value,
//! not the document structure.
#![expect(
    clippy::map_err_ignore,
    reason = "Every failure maps to one message naming the offending value"
)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::core::{Duration, UtcOffset};

/// Date and optional time of day read from a value string, before any
/// `VALUE` parameter or time zone is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeText {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    /// Value was anchored to UTC (`Z` suffix or an explicit offset, already
    /// applied to `date` and `time`).
    pub utc: bool,
}

/// Parses a DATE or DATE-TIME string.
///
/// Accepts the compact form (`YYYYMMDD`, `YYYYMMDDTHHMMSS[Z]`) and the
/// ISO-8601 extended form (`YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.fff][Z|±HH:MM]`).
/// Fractional seconds are dropped. An explicit numeric offset is converted
/// to UTC.
///
/// ## Errors
/// Returns [`RfcError::ValueFormatError`] when the string matches neither form.
pub fn parse_date_time_text(raw: &str) -> RfcResult<DateTimeText> {
    let s = raw.trim();
    let invalid = || RfcError::ValueFormatError(format!("unrecognized date-time value '{raw}'"));

    if s.len() >= 10 && s.as_bytes().get(4) == Some(&b'-') {
        return parse_extended(s).ok_or_else(invalid);
    }

    let date_part = s.get(0..8).ok_or_else(invalid)?;
    let date = compact_fields(date_part)
        .and_then(|[y, m, d]| NaiveDate::from_ymd_opt(i32::try_from(y).ok()?, m, d))
        .ok_or_else(invalid)?;

    let rest = &s[8..];
    if rest.is_empty() {
        return Ok(DateTimeText {
            date,
            time: None,
            utc: false,
        });
    }

    let time_part = rest.strip_prefix(['T', 't']).ok_or_else(invalid)?;
    let (time_part, utc) = match time_part.strip_suffix(['Z', 'z']) {
        Some(stripped) => (stripped, true),
        None => (time_part, false),
    };
    let time = compact_fields(time_part)
        .and_then(|[h, m, sec]| NaiveTime::from_hms_opt(h, m, sec))
        .ok_or_else(invalid)?;

    Ok(DateTimeText {
        date,
        time: Some(time),
        utc,
    })
}

/// Splits `YYYYMMDD` or `HHMMSS` into its three numeric fields.
fn compact_fields(s: &str) -> Option<[u32; 3]> {
    if !(s.len() == 6 || s.len() == 8) || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let split = s.len() - 4;
    Some([
        s[..split].parse().ok()?,
        s[split..split + 2].parse().ok()?,
        s[split + 2..].parse().ok()?,
    ])
}

fn parse_extended(s: &str) -> Option<DateTimeText> {
    if s.len() == 10 {
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
        return Some(DateTimeText {
            date,
            time: None,
            utc: false,
        });
    }

    if let Ok(fixed) = chrono::DateTime::parse_from_rfc3339(s) {
        let utc = fixed.naive_utc().with_nanosecond(0)?;
        return Some(DateTimeText {
            date: utc.date(),
            time: Some(utc.time()),
            utc: true,
        });
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    let naive = naive.with_nanosecond(0)?;
    Some(DateTimeText {
        date: naive.date(),
        time: Some(naive.time()),
        utc: false,
    })
}

/// Parses a UTC-OFFSET value (RFC 5545 §3.3.14).
///
/// Format: `(+|-)HHMM[SS]`, e.g. `+0530`, `-0800`.
///
/// ## Errors
/// Returns [`RfcError::ValueFormatError`] if the string is malformed.
pub fn parse_utc_offset(raw: &str) -> RfcResult<UtcOffset> {
    let s = raw.trim();
    let invalid = || RfcError::ValueFormatError(format!("invalid UTC offset '{raw}'"));

    let (sign, digits) = match s.chars().next() {
        Some('+') => (1, &s[1..]),
        Some('-') => (-1, &s[1..]),
        _ => return Err(invalid()),
    };
    if !(digits.len() == 4 || digits.len() == 6) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let field = |range: std::ops::Range<usize>| -> RfcResult<i32> {
        digits
            .get(range)
            .and_then(|d| d.parse().ok())
            .ok_or_else(invalid)
    };
    let hours = field(0..2)?;
    let minutes = field(2..4)?;
    let seconds = if digits.len() == 6 { field(4..6)? } else { 0 };

    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err(invalid());
    }

    Ok(UtcOffset::new(sign * hours, sign * minutes, sign * seconds))
}

/// Parses a DURATION value (RFC 5545 §3.3.6).
///
/// Format: `[+|-]P[nW][nD][T[nH][nM][nS]]`. Weeks may be combined with
/// other designators, as some producers emit `P1W2D`.
///
/// ## Errors
/// Returns [`RfcError::ValueFormatError`] if the string is not a valid duration.
pub fn parse_duration(raw: &str) -> RfcResult<Duration> {
    let s = raw.trim();
    let invalid = || RfcError::ValueFormatError(format!("invalid duration '{raw}'"));

    let mut dur = Duration::zero();
    let body = if let Some(rest) = s.strip_prefix('-') {
        dur.negative = true;
        rest
    } else {
        s.strip_prefix('+').unwrap_or(s)
    };
    let body = body.strip_prefix(['P', 'p']).ok_or_else(invalid)?;

    let mut in_time = false;
    let mut seen_component = false;
    let mut number = String::new();

    for c in body.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }

        let designator = c.to_ascii_uppercase();
        if designator == 'T' {
            if in_time || !number.is_empty() {
                return Err(invalid());
            }
            in_time = true;
            continue;
        }

        let value: u32 = number.parse().map_err(|_| invalid())?;
        number.clear();
        match (designator, in_time) {
            ('W', false) => dur.weeks = value,
            ('D', false) => dur.days = value,
            ('H', true) => dur.hours = value,
            ('M', true) => dur.minutes = value,
            ('S', true) => dur.seconds = value,
            _ => return Err(invalid()),
        }
        seen_component = true;
    }

    if !number.is_empty() || !seen_component {
        return Err(invalid());
    }

    Ok(dur)
}

/// Unescapes TEXT values (RFC 5545 §3.3.11).
///
/// Escape sequences: `\\` `\,` `\;` `\n` `\N`
#[must_use]
pub fn unescape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => result.push('\n'),
            Some(',') => result.push(','),
            Some(';') => result.push(';'),
            Some('\\') | None => result.push('\\'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
        }
    }

    result
}
