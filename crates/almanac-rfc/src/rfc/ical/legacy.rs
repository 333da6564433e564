//! Lightweight reader for calendar-data payloads that only need a flat
//! event list.
//!
//! No time zone resolution or recurrence expansion happens here; dates are
//! kept as written, with their TZID and VALUE parameters.

use crate::error::RfcResult;
use crate::rfc::ical::core::{ContentLine, Parameter};
use crate::rfc::ical::normalize::{NormalizedEvent, normalize_event};
use crate::rfc::ical::parse::error::{ParseError, ParseErrorKind};
use crate::rfc::ical::parse::lexer::{parse_content_line, split_lines};

/// A DTSTART or DTEND as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleDate {
    pub tzid: Option<String>,
    /// The `VALUE` parameter (`DATE` or `DATE-TIME`).
    pub value: Option<String>,
    pub val: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleEvent {
    pub created: Option<String>,
    pub dtstamp: Option<String>,
    pub last_modified: Option<String>,
    pub uid: Option<String>,
    pub summary: Option<String>,
    pub class: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub sequence: Option<String>,
    pub status: Option<String>,
    pub transp: Option<String>,
    pub dtstart: Option<SimpleDate>,
    pub dtend: Option<SimpleDate>,
}

impl SimpleEvent {
    /// Flattens the event; a missing DTEND reuses DTSTART.
    #[must_use]
    pub fn normalize(&self) -> NormalizedEvent {
        let start = self.dtstart.as_ref().map_or("", |d| d.val.as_str());
        let end = self.dtend.as_ref().map_or(start, |d| d.val.as_str());
        normalize_event(
            self.summary.as_deref().unwrap_or_default(),
            self.description.as_deref().unwrap_or_default(),
            start,
            end,
        )
    }

    fn apply(&mut self, line: ContentLine) {
        let ContentLine {
            name,
            params,
            raw_value,
        } = line;

        let slot = match name.as_str() {
            "CREATED" => &mut self.created,
            "DTSTAMP" => &mut self.dtstamp,
            "LAST-MODIFIED" => &mut self.last_modified,
            "UID" => &mut self.uid,
            "SUMMARY" => &mut self.summary,
            "CLASS" => &mut self.class,
            "DESCRIPTION" => &mut self.description,
            "LOCATION" => &mut self.location,
            "SEQUENCE" => &mut self.sequence,
            "STATUS" => &mut self.status,
            "TRANSP" => &mut self.transp,
            "DTSTART" | "DTEND" => {
                let param = |key: &str| {
                    params
                        .iter()
                        .find(|p| p.name == key)
                        .and_then(Parameter::value)
                        .map(str::to_string)
                };
                let date = SimpleDate {
                    tzid: param("TZID"),
                    value: param("VALUE"),
                    val: raw_value,
                };
                if name == "DTSTART" {
                    self.dtstart = Some(date);
                } else {
                    self.dtend = Some(date);
                }
                return;
            }
            _ => return,
        };
        *slot = Some(raw_value);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleCalendar {
    pub prodid: Option<String>,
    pub version: Option<String>,
    pub calscale: Option<String>,
    pub method: Option<String>,
    pub events: Vec<SimpleEvent>,
}

impl SimpleCalendar {
    #[must_use]
    pub fn normalized(&self) -> Vec<NormalizedEvent> {
        self.events.iter().map(SimpleEvent::normalize).collect()
    }
}

/// ## Summary
/// Reads calendar metadata and a flat list of VEVENTs.
///
/// Properties of components nested inside a VEVENT (such as VALARM) are not
/// attributed to the event. Component nesting outside VEVENTs is not
/// checked.
///
/// ## Errors
/// Returns [`crate::error::RfcError::StructureError`] for a malformed content
/// line or a VEVENT still open at the end of input.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse_simple(input: &str) -> RfcResult<SimpleCalendar> {
    let mut calendar = SimpleCalendar::default();
    let mut open_event: Option<(usize, SimpleEvent, usize)> = None;

    for (line_num, raw) in split_lines(input) {
        let line = parse_content_line(&raw, line_num)?;
        let is_begin = line.name == "BEGIN";
        let is_end = line.name == "END";
        let is_vevent = line.raw_value.eq_ignore_ascii_case("VEVENT");

        if let Some((begin_line, mut event, mut depth)) = open_event.take() {
            match (is_begin, is_end) {
                (true, _) => depth += 1,
                (_, true) if depth > 0 => depth -= 1,
                (_, true) if is_vevent => {
                    calendar.events.push(event);
                    continue;
                }
                (_, true) => tracing::trace!(line = line_num, "Ignoring stray END inside VEVENT"),
                _ if depth == 0 => event.apply(line),
                _ => {}
            }
            open_event = Some((begin_line, event, depth));
            continue;
        }

        if is_begin && is_vevent {
            open_event = Some((line_num, SimpleEvent::default(), 0));
            continue;
        }

        let value = Some(line.raw_value);
        match line.name.as_str() {
            "PRODID" => calendar.prodid = value,
            "VERSION" => calendar.version = value,
            "CALSCALE" => calendar.calscale = value,
            "METHOD" => calendar.method = value,
            _ => {}
        }
    }

    if let Some((begin_line, _, _)) = open_event {
        return Err(ParseError::new(ParseErrorKind::MissingEnd, begin_line, 0)
            .with_context("missing END:VEVENT")
            .into());
    }

    tracing::debug!(events = calendar.events.len(), "Read simple calendar");

    Ok(calendar)
}
