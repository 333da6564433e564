//! The flat event record handed to hosts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One event or recurrence instance as consumed downstream.
///
/// `start_time` and `end_time` are `YYYY-MM-DD` for all-day values and
/// `YYYY-MM-DDTHH:MM:SS` for timed ones, with a trailing `Z` only when the
/// source value was UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    pub summary: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
}

/// A record with the UTC instant its start sorts by. Floating starts count
/// as UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedRecord {
    pub instant: DateTime<Utc>,
    pub record: NormalizedEvent,
}

/// ## Summary
/// Builds a record from raw strings.
///
/// Values that already contain a `-` are taken as formatted. Compact values
/// are expanded: `YYYYMMDD` to `YYYY-MM-DD` and `YYYYMMDDTHHMMSS[Z]` to
/// `YYYY-MM-DDTHH:MM:SS`.
#[must_use]
pub fn normalize_event(summary: &str, description: &str, start: &str, end: &str) -> NormalizedEvent {
    NormalizedEvent {
        summary: summary.to_string(),
        description: description.to_string(),
        start_time: expand_compact(start),
        end_time: expand_compact(end),
    }
}

fn expand_compact(value: &str) -> String {
    if value.contains('-') {
        return value.to_string();
    }

    let (date, time) = match value.split_once(['T', 't']) {
        Some((date, time)) => (date, Some(time)),
        None => (value, None),
    };

    let Some(date) = split_fields(date, [4, 2, 2]).map(|[y, m, d]| format!("{y}-{m}-{d}")) else {
        tracing::debug!(%value, "Leaving unrecognized date value as-is");
        return value.to_string();
    };

    match time.map(|t| split_fields(t, [2, 2, 2])) {
        None => date,
        Some(Some([h, mi, s])) => format!("{date}T{h}:{mi}:{s}"),
        Some(None) => {
            tracing::debug!(%value, "Leaving unrecognized time value as-is");
            value.to_string()
        }
    }
}

/// Cuts the leading digits of `s` into fields of the given widths.
fn split_fields<const N: usize>(s: &str, widths: [usize; N]) -> Option<[&str; N]> {
    let mut fields = [""; N];
    let mut pos = 0;
    for (field, width) in fields.iter_mut().zip(widths) {
        let part = s.get(pos..pos + width)?;
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *field = part;
        pos += width;
    }
    Some(fields)
}
