//! VCALENDAR as a typed document.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::component::{Component, ComponentKind};
use super::event::EventComponent;
use super::property::{PropertyValue, names};
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::expand::{
    ExpansionOptions, ParseOptions, TimezoneDefinition, build_timezone_table,
};
use crate::rfc::ical::normalize::{NormalizedEvent, TimedRecord};
use crate::rfc::ical::parse::parse;

const KNOWN_PROPERTIES: &[&str] = &[names::PRODID, names::VERSION, names::CALSCALE, names::METHOD];

/// A parsed calendar: metadata, time zones and events.
///
/// Built in one pass and never modified afterwards. Events reference the
/// document's time zones through shared pointers.
#[derive(Debug, Clone)]
pub struct CalendarDocument {
    pub prodid: Option<String>,
    pub version: Option<String>,
    pub calscale: Option<String>,
    pub method: Option<String>,
    pub timezones: Vec<Arc<TimezoneDefinition>>,
    pub events: Vec<EventComponent>,
    /// Unrecognized calendar-level properties in document order.
    pub extra: Vec<PropertyValue>,
}

impl CalendarDocument {
    /// ## Summary
    /// Parses calendar text with default options.
    ///
    /// ## Errors
    /// See [`Self::parse_with_options`].
    pub fn parse(input: &str) -> RfcResult<Self> {
        Self::parse_with_options(input, &ParseOptions::default())
    }

    /// ## Summary
    /// Parses calendar text into a document.
    ///
    /// Either the whole document is built or an error is returned.
    ///
    /// ## Errors
    /// Returns [`RfcError::StructureError`] for malformed nesting or a missing
    /// required property, and value errors for malformed values.
    #[tracing::instrument(skip(input, options), fields(input_len = input.len()))]
    pub fn parse_with_options(input: &str, options: &ParseOptions) -> RfcResult<Self> {
        let root = parse(input)?;
        Self::from_component(&root, options)
    }

    /// ## Summary
    /// Builds a document from a VCALENDAR component. Time zones are built
    /// first so events can resolve their TZID parameters.
    ///
    /// ## Errors
    /// See [`Self::parse_with_options`].
    pub fn from_component(root: &Component, options: &ParseOptions) -> RfcResult<Self> {
        let timezones = build_timezone_table(root)?;

        let events = root
            .children_of(ComponentKind::Event)
            .map(|component| EventComponent::from_component(component, &timezones, options))
            .collect::<RfcResult<Vec<_>>>()?;

        let scalar = |key: &str| root.get_property(key).map(PropertyValue::joined);

        let document = Self {
            prodid: scalar(names::PRODID),
            version: scalar(names::VERSION),
            calscale: scalar(names::CALSCALE),
            method: scalar(names::METHOD),
            timezones: timezones.definitions().to_vec(),
            events,
            extra: root
                .properties
                .iter()
                .filter(|p| !KNOWN_PROPERTIES.contains(&p.name.as_str()))
                .cloned()
                .collect(),
        };

        tracing::debug!(
            timezones = document.timezones.len(),
            events = document.events.len(),
            "Built calendar document"
        );

        Ok(document)
    }

    /// Looks up a time zone by TZID.
    #[must_use]
    pub fn timezone(&self, tzid: &str) -> Option<&Arc<TimezoneDefinition>> {
        self.timezones.iter().find(|tz| tz.tzid == tzid)
    }

    /// ## Summary
    /// Normalized records for everything starting in `[from, until)`: each
    /// non-recurring event whose start falls inside, plus each recurrence
    /// instance. Records are ordered by start.
    ///
    /// ## Errors
    /// See [`Self::timed_records_between`].
    pub fn normalized_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        options: &ExpansionOptions,
    ) -> RfcResult<Vec<NormalizedEvent>> {
        Ok(self
            .timed_records_between(from, until, options)?
            .into_iter()
            .map(|timed| timed.record)
            .collect())
    }

    /// ## Summary
    /// Like [`Self::normalized_between`], keeping the UTC instant of each
    /// start so records from several documents can be merged in order.
    ///
    /// An event whose offsets or recurrences cannot be resolved is logged and
    /// left out; the other events are still returned.
    ///
    /// ## Errors
    /// Returns [`RfcError::RecurrenceWindowError`] if `until <= from`.
    pub fn timed_records_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        options: &ExpansionOptions,
    ) -> RfcResult<Vec<TimedRecord>> {
        if until <= from {
            return Err(RfcError::RecurrenceWindowError(format!(
                "window end {until} is not after its start {from}"
            )));
        }

        let mut records = Vec::new();
        for event in &self.events {
            match event_records(event, from, until, options) {
                Ok(found) => records.extend(found),
                Err(error) => {
                    tracing::warn!(uid = ?event.uid, %error, "Skipping event that could not be expanded");
                }
            }
        }

        records.sort_by_key(|timed| timed.instant);
        Ok(records)
    }
}

fn event_records(
    event: &EventComponent,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    options: &ExpansionOptions,
) -> RfcResult<Vec<TimedRecord>> {
    if !event.is_recurring() {
        let instant = event.dtstart.window_instant()?;
        if instant < from || instant >= until {
            return Ok(Vec::new());
        }
        return Ok(vec![TimedRecord {
            instant,
            record: event.normalize(),
        }]);
    }

    event
        .recurrences_between_with(from, until, options)?
        .into_iter()
        .map(|instance| {
            Ok(TimedRecord {
                instant: instance.dtstart.window_instant()?,
                record: instance.normalize(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DOCUMENT: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Example//Almanac//EN\r\n\
CALSCALE:GREGORIAN\r\n\
X-WR-CALNAME:Team\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Europe/Berlin\r\n\
BEGIN:DAYLIGHT\r\n\
TZOFFSETFROM:+0100\r\n\
TZOFFSETTO:+0200\r\n\
DTSTART:19700329T020000\r\n\
RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU\r\n\
END:DAYLIGHT\r\n\
BEGIN:STANDARD\r\n\
TZOFFSETFROM:+0200\r\n\
TZOFFSETTO:+0100\r\n\
DTSTART:19701025T030000\r\n\
RRULE:FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU\r\n\
END:STANDARD\r\n\
END:VTIMEZONE\r\n\
BEGIN:VEVENT\r\n\
UID:standup\r\n\
SUMMARY:Standup\r\n\
DTSTART;TZID=Europe/Berlin:20240701T093000\r\n\
DTEND;TZID=Europe/Berlin:20240701T094500\r\n\
RRULE:FREQ=DAILY;COUNT=3\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:offsite\r\n\
SUMMARY:Offsite\r\n\
DTSTART;VALUE=DATE:20240702\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn reads_metadata_and_components() {
        let doc = CalendarDocument::parse(DOCUMENT).unwrap();
        assert_eq!(doc.version.as_deref(), Some("2.0"));
        assert_eq!(doc.prodid.as_deref(), Some("-//Example//Almanac//EN"));
        assert_eq!(doc.calscale.as_deref(), Some("GREGORIAN"));
        assert!(doc.method.is_none());
        assert_eq!(doc.extra.len(), 1);
        assert_eq!(doc.timezones.len(), 1);
        assert_eq!(doc.events.len(), 2);
    }

    #[test]
    fn events_share_the_document_timezone() {
        let doc = CalendarDocument::parse(DOCUMENT).unwrap();
        let tz = doc.timezone("Europe/Berlin").unwrap();
        let event_tz = doc.events[0].dtstart.timezone().unwrap();
        assert!(Arc::ptr_eq(tz, event_tz));
        assert_eq!(doc.events[0].start_time().unwrap(), "2024-07-01T09:30:00+02:00");
    }

    #[test]
    fn normalized_between_merges_and_sorts() {
        let doc = CalendarDocument::parse(DOCUMENT).unwrap();
        let from = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
        let records = doc
            .normalized_between(from, until, &ExpansionOptions::default())
            .unwrap();

        let starts: Vec<_> = records.iter().map(|r| r.start_time.as_str()).collect();
        assert_eq!(
            starts,
            vec![
                "2024-07-01T09:30:00",
                "2024-07-02",
                "2024-07-02T09:30:00",
                "2024-07-03T09:30:00",
            ]
        );
        assert_eq!(records[1].summary, "Offsite");
        assert_eq!(records[1].end_time, "2024-07-03");
    }

    #[test]
    fn normalized_between_rejects_reversed_window() {
        let doc = CalendarDocument::parse(DOCUMENT).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            doc.normalized_between(at, at, &ExpansionOptions::default()),
            Err(RfcError::RecurrenceWindowError(_))
        ));
    }

    #[test]
    fn unresolvable_event_does_not_hide_the_others() {
        let text = "BEGIN:VCALENDAR\n\
BEGIN:VTIMEZONE\n\
TZID:Broken\n\
BEGIN:STANDARD\n\
DTSTART:19701025T030000\n\
END:STANDARD\n\
END:VTIMEZONE\n\
BEGIN:VEVENT\n\
UID:good\n\
SUMMARY:Good\n\
DTSTART:20240105T100000Z\n\
END:VEVENT\n\
BEGIN:VEVENT\n\
UID:broken\n\
SUMMARY:Broken\n\
DTSTART;TZID=Broken:20240106T100000\n\
END:VEVENT\n\
END:VCALENDAR\n";
        let doc = CalendarDocument::parse(text).unwrap();
        assert!(matches!(
            doc.events[1].dtstart.utc_instant(),
            Err(RfcError::AmbiguousTimezoneError(_))
        ));

        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let records = doc
            .normalized_between(from, until, &ExpansionOptions::default())
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].summary, "Good");
    }

    #[test]
    fn timed_records_carry_utc_instants() {
        let doc = CalendarDocument::parse(DOCUMENT).unwrap();
        let from = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2024, 7, 2, 0, 0, 0).unwrap();
        let timed = doc
            .timed_records_between(from, until, &ExpansionOptions::default())
            .unwrap();
        assert_eq!(timed.len(), 1);
        assert_eq!(
            timed[0].instant,
            Utc.with_ymd_and_hms(2024, 7, 1, 7, 30, 0).unwrap()
        );
    }

    #[test]
    fn unclosed_event_yields_no_document() {
        let text = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nDTSTART:20240101\nEND:VCALENDAR\n";
        assert!(matches!(
            CalendarDocument::parse(text),
            Err(RfcError::StructureError(_))
        ));
    }
}
