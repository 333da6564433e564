//! VEVENT as a typed component, with DTEND derivation and recurrence
//! expansion.

use std::sync::Arc;

use almanac_core::types::DefaultEndPolicy;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

use super::component::Component;
use super::datetime::DateTimeValue;
use super::duration::Duration;
use super::property::{PropertyValue, names};
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::expand::{ExpansionOptions, ParseOptions, RecurrenceRule, TimezoneTable};
use crate::rfc::ical::normalize::NormalizedEvent;
use crate::rfc::ical::parse::error::{ParseError, ParseErrorKind};
use crate::rfc::ical::parse::values::{parse_duration, unescape_text};

/// Properties with a dedicated field; anything else lands in
/// [`EventComponent::extra`].
const KNOWN_PROPERTIES: &[&str] = &[
    names::UID,
    names::SUMMARY,
    names::DESCRIPTION,
    names::STATUS,
    names::SEQUENCE,
    names::CLASS,
    names::LOCATION,
    names::TRANSP,
    names::CREATED,
    names::DTSTAMP,
    names::LAST_MODIFIED,
    names::DTSTART,
    names::DTEND,
    names::DURATION,
    names::RRULE,
];

/// A single scheduled event.
///
/// `dtend` is always present: it is read from DTEND, derived from DURATION,
/// or defaulted from DTSTART. Recurrence instances are standalone copies
/// with shifted times and no rule.
#[derive(Debug, Clone)]
pub struct EventComponent {
    pub uid: Option<String>,
    /// Unescaped text.
    pub summary: Option<String>,
    /// Unescaped text.
    pub description: Option<String>,
    pub status: Option<String>,
    pub sequence: Option<String>,
    pub class: Option<String>,
    /// Unescaped text.
    pub location: Option<String>,
    pub transp: Option<String>,
    pub created: Option<String>,
    pub dtstamp: Option<String>,
    pub last_modified: Option<String>,
    pub dtstart: DateTimeValue,
    pub dtend: DateTimeValue,
    pub duration: Option<Duration>,
    pub rrule: Option<RecurrenceRule>,
    /// Unrecognized properties in document order.
    pub extra: Vec<PropertyValue>,
}

impl EventComponent {
    /// ## Summary
    /// Builds an event from a VEVENT component, resolving TZID parameters
    /// through `timezones`.
    ///
    /// DURATION takes precedence over DTEND. With neither, a DATE event spans
    /// one day and a DATE-TIME event ends as `options.default_end` says.
    ///
    /// ## Errors
    /// Returns [`RfcError::StructureError`] if DTSTART is missing,
    /// [`RfcError::ValueTypeError`] for a DURATION with a time part on a DATE
    /// start, and value errors for malformed dates, durations or rules.
    pub fn from_component(
        component: &Component,
        timezones: &TimezoneTable,
        options: &ParseOptions,
    ) -> RfcResult<Self> {
        let dtstart = component
            .get_property(names::DTSTART)
            .ok_or_else(|| {
                ParseError::new(ParseErrorKind::MissingRequiredProperty, component.line, 0)
                    .with_context("VEVENT is missing DTSTART")
            })
            .map_err(RfcError::from)
            .and_then(|prop| date_time_property(prop, timezones))?;

        let duration = component
            .get_property(names::DURATION)
            .map(|prop| parse_duration(&prop.joined()))
            .transpose()?;

        let dtend = match (&duration, component.get_property(names::DTEND)) {
            (Some(duration), _) => end_from_duration(&dtstart, duration)?,
            (None, Some(prop)) => date_time_property(prop, timezones)?,
            (None, None) => default_end(&dtstart, options.default_end)?,
        };

        let rrule = component
            .get_property(names::RRULE)
            .map(|prop| {
                RecurrenceRule::new(
                    &prop.joined(),
                    dtstart.naive_local(),
                    dtstart.timezone().map(Arc::as_ref),
                )
            })
            .transpose()?;

        let text = |key: &str| component.get_property(key).map(|p| unescape_text(&p.joined()));
        let raw = |key: &str| component.get_property(key).map(PropertyValue::joined);

        let event = Self {
            uid: raw(names::UID),
            summary: text(names::SUMMARY),
            description: text(names::DESCRIPTION),
            status: raw(names::STATUS),
            sequence: raw(names::SEQUENCE),
            class: raw(names::CLASS),
            location: text(names::LOCATION),
            transp: raw(names::TRANSP),
            created: raw(names::CREATED),
            dtstamp: raw(names::DTSTAMP),
            last_modified: raw(names::LAST_MODIFIED),
            dtstart,
            dtend,
            duration,
            rrule,
            extra: component
                .properties
                .iter()
                .filter(|p| !KNOWN_PROPERTIES.contains(&p.name.as_str()))
                .cloned()
                .collect(),
        };

        tracing::trace!(
            uid = ?event.uid,
            dtstart = %event.dtstart,
            dtend = %event.dtend,
            recurring = event.rrule.is_some(),
            "Built event"
        );

        Ok(event)
    }

    /// SUMMARY, or an empty string.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.summary.as_deref().unwrap_or_default()
    }

    /// DESCRIPTION, or an empty string.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// DTSTART in its own local time with offset.
    ///
    /// ## Errors
    /// Returns [`RfcError::NoTimezoneError`] for a floating DATE-TIME.
    pub fn start_time(&self) -> RfcResult<String> {
        self.dtstart.to_local_string()
    }

    /// DTEND in its own local time with offset.
    ///
    /// ## Errors
    /// Returns [`RfcError::NoTimezoneError`] for a floating DATE-TIME.
    pub fn end_time(&self) -> RfcResult<String> {
        self.dtend.to_local_string()
    }

    #[must_use]
    pub const fn is_recurring(&self) -> bool {
        self.rrule.is_some()
    }

    /// ## Summary
    /// Expands the rule into every instance starting in `[from, until)`.
    ///
    /// ## Errors
    /// See [`Self::recurrences_between_with`].
    pub fn recurrences_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> RfcResult<Vec<Self>> {
        self.recurrences_between_with(from, until, &ExpansionOptions::default())
    }

    /// ## Summary
    /// Expands the rule into instances starting in `[from, until)`.
    ///
    /// The rule runs on DTSTART's local clock fields. Each candidate keeps
    /// DTSTART's form and parameters, its end keeps the original span, and it
    /// is kept when its UTC instant falls inside the window; floating values
    /// are compared as if they were UTC. Nothing is cached, so repeated calls
    /// give the same result. An event without a rule yields no instances.
    /// With `options.max_instances` set, the earliest instances up to the cap
    /// are returned and the truncation is logged.
    ///
    /// ## Errors
    /// Returns [`RfcError::RecurrenceWindowError`] if `until <= from`, before
    /// any evaluation. Offset resolution errors of the event's zone are
    /// propagated.
    pub fn recurrences_between_with(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        options: &ExpansionOptions,
    ) -> RfcResult<Vec<Self>> {
        if until <= from {
            return Err(RfcError::RecurrenceWindowError(format!(
                "window end {until} is not after its start {from}"
            )));
        }
        let Some(rule) = &self.rrule else {
            return Ok(Vec::new());
        };

        // Zone offsets stay within a day, so a day of slack on each side
        // catches every local clock value that can land inside the window.
        let slack = TimeDelta::days(1);
        let wall_from = shift(from.naive_utc(), -slack)?;
        let wall_until = shift(until.naive_utc(), slack)?;

        let span = self
            .dtend
            .naive_local()
            .signed_duration_since(self.dtstart.naive_local());

        let mut template = self.clone();
        template.rrule = None;

        let mut instances = Vec::new();
        for candidate in rule.between(wall_from, wall_until)? {
            let dtstart = self.dtstart.with_naive_local(candidate);
            let instant = dtstart.window_instant()?;
            if instant < from || instant >= until {
                continue;
            }

            if let Some(cap) = options.max_instances
                && instances.len() == usize::from(cap)
            {
                tracing::warn!(
                    uid = ?self.uid,
                    max_instances = cap,
                    "Recurrence expansion reached the instance cap"
                );
                break;
            }

            let mut instance = template.clone();
            instance.dtend = self.dtend.with_naive_local(shift(candidate, span)?);
            instance.dtstart = dtstart;
            instances.push(instance);
        }

        tracing::debug!(uid = ?self.uid, count = instances.len(), "Expanded recurrences");

        Ok(instances)
    }

    /// ## Summary
    /// Expands from DTSTART up to `until`.
    ///
    /// ## Errors
    /// See [`Self::recurrences_between_with`].
    pub fn recurrences_until(
        &self,
        until: DateTime<Utc>,
        options: &ExpansionOptions,
    ) -> RfcResult<Vec<Self>> {
        self.recurrences_between_with(self.dtstart.window_instant()?, until, options)
    }

    /// ## Summary
    /// Expands from DTSTART up to `options.lookahead_days` from now. An event
    /// starting after that horizon has no instances.
    ///
    /// With `options.max_instances` set, the cap keeps the latest instances,
    /// those nearest the horizon, and drops older ones.
    ///
    /// ## Errors
    /// See [`Self::recurrences_between_with`].
    pub fn recurrences(&self, options: &ExpansionOptions) -> RfcResult<Vec<Self>> {
        let until = Utc::now() + TimeDelta::days(i64::from(options.lookahead_days));
        if until <= self.dtstart.window_instant()? {
            return Ok(Vec::new());
        }

        let uncapped = ExpansionOptions {
            max_instances: None,
            ..*options
        };
        let mut instances = self.recurrences_until(until, &uncapped)?;

        if let Some(cap) = options.max_instances {
            let excess = instances.len().saturating_sub(usize::from(cap));
            if excess > 0 {
                tracing::warn!(
                    uid = ?self.uid,
                    max_instances = cap,
                    dropped = excess,
                    "Recurrence expansion reached the instance cap, dropping the oldest instances"
                );
                instances.drain(..excess);
            }
        }

        Ok(instances)
    }

    /// Flattens this event into the record handed to hosts.
    #[must_use]
    pub fn normalize(&self) -> NormalizedEvent {
        NormalizedEvent {
            summary: self.summary().to_string(),
            description: self.description().to_string(),
            start_time: self.dtstart.to_wall_clock_string(),
            end_time: self.dtend.to_wall_clock_string(),
        }
    }
}

fn date_time_property(prop: &PropertyValue, timezones: &TimezoneTable) -> RfcResult<DateTimeValue> {
    let timezone = timezones.resolve(prop.param(names::TZID));
    DateTimeValue::parse(&prop.joined(), &prop.params, timezone)
}

/// A DATE start moves by whole days only, so DURATION must not carry a
/// time part there.
fn end_from_duration(dtstart: &DateTimeValue, duration: &Duration) -> RfcResult<DateTimeValue> {
    if !dtstart.is_date() {
        return dtstart.shifted(duration.as_time_delta());
    }
    if duration.has_time() {
        return Err(RfcError::ValueTypeError(format!(
            "DURATION {duration} has a time part but DTSTART {dtstart} is a DATE"
        )));
    }
    let mut end = dtstart.clone();
    end.add_days(duration.total_days())?;
    Ok(end)
}

fn default_end(dtstart: &DateTimeValue, policy: DefaultEndPolicy) -> RfcResult<DateTimeValue> {
    if dtstart.is_date() {
        return dtstart.shifted(TimeDelta::days(1));
    }
    match policy {
        DefaultEndPolicy::NextDay => {
            let mut end = dtstart.shifted(TimeDelta::days(1))?;
            end.truncate_time();
            Ok(end)
        }
        DefaultEndPolicy::ZeroDuration => Ok(dtstart.clone()),
    }
}

fn shift(value: NaiveDateTime, delta: TimeDelta) -> RfcResult<NaiveDateTime> {
    value
        .checked_add_signed(delta)
        .ok_or_else(|| RfcError::ValueFormatError(format!("{value} shifted by {delta} leaves the supported range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc::ical::core::{ComponentKind, UtcOffset};
    use crate::rfc::ical::expand::TimezoneDefinition;
    use crate::rfc::ical::parse::parse;
    use chrono::TimeZone;

    fn event(body: &str) -> RfcResult<EventComponent> {
        event_with(body, &TimezoneTable::new(), &ParseOptions::default())
    }

    fn event_with(
        body: &str,
        timezones: &TimezoneTable,
        options: &ParseOptions,
    ) -> RfcResult<EventComponent> {
        let text = format!("BEGIN:VCALENDAR\nBEGIN:VEVENT\n{body}END:VEVENT\nEND:VCALENDAR\n");
        let root = parse(&text)?;
        let vevent = root.first_child(ComponentKind::Event).unwrap();
        EventComponent::from_component(vevent, timezones, options)
    }

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn all_day_default_end() {
        let ev = event("DTSTART:20240101\n").unwrap();
        assert_eq!(ev.normalize().start_time, "2024-01-01");
        assert_eq!(ev.normalize().end_time, "2024-01-02");
    }

    #[test]
    fn timed_default_end_is_next_midnight() {
        let ev = event("DTSTART:20240101T100000\n").unwrap();
        assert_eq!(ev.normalize().end_time, "2024-01-02T00:00:00");
    }

    #[test]
    fn timed_default_end_can_be_zero_length() {
        let options = ParseOptions {
            default_end: DefaultEndPolicy::ZeroDuration,
        };
        let ev = event_with("DTSTART:20240101T100000\n", &TimezoneTable::new(), &options).unwrap();
        assert_eq!(ev.dtend, ev.dtstart);
    }

    #[test]
    fn duration_overrides_dtend() {
        let ev = event("DTSTART:20240101T100000\nDTEND:20240105T100000\nDURATION:PT2H30M\n").unwrap();
        assert_eq!(ev.normalize().end_time, "2024-01-01T12:30:00");
        assert!(ev.duration.is_some());
    }

    #[test]
    fn all_day_duration_in_days() {
        let ev = event("DTSTART;VALUE=DATE:20240101\nDURATION:P1W2D\n").unwrap();
        assert_eq!(ev.normalize().end_time, "2024-01-10");
    }

    #[test]
    fn all_day_duration_with_time_part_is_rejected() {
        let err = event("DTSTART;VALUE=DATE:20240101\nDURATION:PT36H\n").unwrap_err();
        assert!(matches!(err, RfcError::ValueTypeError(_)), "got {err:?}");
    }

    #[test]
    fn missing_dtstart_is_structural() {
        let err = event("SUMMARY:No start\n").unwrap_err();
        assert!(matches!(err, RfcError::StructureError(_)));
    }

    #[test]
    fn text_is_unescaped_and_residuals_kept() {
        let ev = event(
            "DTSTART:20240101\nSUMMARY:Lunch\\, then coffee\nDESCRIPTION:Line one\\nLine two\nX-COLOR:red\nCATEGORIES:A,B\n",
        )
        .unwrap();
        assert_eq!(ev.summary(), "Lunch, then coffee");
        assert_eq!(ev.description(), "Line one\nLine two");
        let extras: Vec<_> = ev.extra.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(extras, vec!["xColor", "categories"]);
    }

    #[test]
    fn missing_text_reads_empty() {
        let ev = event("DTSTART:20240101\n").unwrap();
        assert_eq!(ev.summary(), "");
        assert_eq!(ev.description(), "");
    }

    #[test]
    fn zoned_start_renders_offset() {
        let mut table = TimezoneTable::new();
        table.register(TimezoneDefinition::fixed("Asia/Tokyo", UtcOffset::new(9, 0, 0)));
        let ev = event_with(
            "DTSTART;TZID=Asia/Tokyo:20240301T090000\nDTEND;TZID=Asia/Tokyo:20240301T100000\n",
            &table,
            &ParseOptions::default(),
        )
        .unwrap();
        assert_eq!(ev.start_time().unwrap(), "2024-03-01T09:00:00+09:00");
        assert_eq!(ev.dtstart.to_utc_string().unwrap(), "2024-03-01T00:00:00Z");
    }

    #[test]
    fn unknown_tzid_is_floating() {
        let ev = event("DTSTART;TZID=Mars/Olympus:20240301T090000\n").unwrap();
        assert!(ev.dtstart.timezone().is_none());
        assert!(matches!(ev.start_time(), Err(RfcError::NoTimezoneError(_))));
    }

    #[test]
    fn weekly_expansion_keeps_span() {
        let ev = event("DTSTART:20240101T090000\nDTEND:20240101T103000\nRRULE:FREQ=WEEKLY;COUNT=3\n").unwrap();
        let instances = ev.recurrences_between(utc(2024, 1, 1), utc(2025, 1, 1)).unwrap();
        let starts: Vec<_> = instances.iter().map(|e| e.normalize().start_time).collect();
        assert_eq!(
            starts,
            vec!["2024-01-01T09:00:00", "2024-01-08T09:00:00", "2024-01-15T09:00:00"]
        );
        for instance in &instances {
            assert!(instance.rrule.is_none());
            assert_eq!(
                instance.dtend.naive_local() - instance.dtstart.naive_local(),
                TimeDelta::minutes(90)
            );
        }
    }

    #[test]
    fn expansion_respects_zone() {
        let mut table = TimezoneTable::new();
        table.register(TimezoneDefinition::fixed("Asia/Tokyo", UtcOffset::new(9, 0, 0)));
        let ev = event_with(
            "DTSTART;TZID=Asia/Tokyo:20240101T080000\nRRULE:FREQ=DAILY;COUNT=5\n",
            &table,
            &ParseOptions::default(),
        )
        .unwrap();
        // 08:00 in Tokyo is 23:00 UTC on the previous day.
        let instances = ev.recurrences_between(utc(2024, 1, 2), utc(2024, 1, 4)).unwrap();
        let starts: Vec<_> = instances.iter().map(|e| e.dtstart.naive_local().to_string()).collect();
        assert_eq!(starts, vec!["2024-01-03 08:00:00", "2024-01-04 08:00:00"]);
        assert!(instances.iter().all(|e| e.dtstart.timezone().is_some()));
    }

    #[test]
    fn reversed_window_fails_even_without_rule() {
        let ev = event("DTSTART:20240101\n").unwrap();
        assert!(matches!(
            ev.recurrences_between(utc(2024, 2, 1), utc(2024, 1, 1)),
            Err(RfcError::RecurrenceWindowError(_))
        ));
        assert!(ev.recurrences_between(utc(2024, 1, 1), utc(2024, 2, 1)).unwrap().is_empty());
    }

    #[test]
    fn instance_cap_truncates() {
        let ev = event("DTSTART:20240101T090000\nRRULE:FREQ=DAILY\n").unwrap();
        let options = ExpansionOptions {
            max_instances: Some(10),
            ..ExpansionOptions::default()
        };
        let instances = ev
            .recurrences_between_with(utc(2024, 1, 1), utc(2025, 1, 1), &options)
            .unwrap();
        assert_eq!(instances.len(), 10);
    }

    #[test]
    fn expansion_is_repeatable() {
        let ev = event("DTSTART:20240101\nRRULE:FREQ=MONTHLY;BYMONTHDAY=15\n").unwrap();
        let first = ev.recurrences_between(utc(2024, 1, 1), utc(2024, 6, 1)).unwrap();
        let second = ev.recurrences_between(utc(2024, 1, 1), utc(2024, 6, 1)).unwrap();
        assert_eq!(first.len(), 5);
        let dates = |events: &[EventComponent]| -> Vec<String> {
            events.iter().map(|e| e.normalize().start_time).collect()
        };
        assert_eq!(dates(&first), dates(&second));
        assert_eq!(first[0].normalize().start_time, "2024-01-15");
        assert_eq!(first[0].normalize().end_time, "2024-01-16");
    }

    #[test]
    fn recurrences_until_starts_at_dtstart() {
        let ev = event("DTSTART:20240101T090000\nRRULE:FREQ=DAILY;COUNT=4\n").unwrap();
        let instances = ev
            .recurrences_until(utc(2024, 1, 3), &ExpansionOptions::default())
            .unwrap();
        assert_eq!(instances.len(), 2);
    }

    #[test]
    fn recurrences_use_lookahead_from_now() {
        let start = Utc::now() - TimeDelta::days(3);
        let body = format!("DTSTART:{}Z\nRRULE:FREQ=DAILY\n", start.format("%Y%m%dT%H%M%S"));
        let ev = event(&body).unwrap();
        let options = ExpansionOptions {
            lookahead_days: 7,
            ..ExpansionOptions::default()
        };
        let instances = ev.recurrences(&options).unwrap();
        assert!((9..=11).contains(&instances.len()), "got {}", instances.len());
    }

    #[test]
    fn expansion_returns_every_instance_in_window() {
        let ev = event("DTSTART:20240101T000000Z\nRRULE:FREQ=HOURLY\n").unwrap();
        let instances = ev.recurrences_between(utc(2024, 1, 1), utc(2024, 3, 1)).unwrap();
        assert_eq!(instances.len(), 60 * 24);
        assert_eq!(
            instances.last().unwrap().normalize().start_time,
            "2024-02-29T23:00:00Z"
        );
    }

    #[test]
    fn recurrences_reach_the_horizon_for_old_series() {
        let ev = event("DTSTART:20200101T090000Z\nRRULE:FREQ=DAILY\n").unwrap();
        let horizon = Utc::now() + TimeDelta::days(7);

        let all = ev
            .recurrences(&ExpansionOptions {
                lookahead_days: 7,
                ..ExpansionOptions::default()
            })
            .unwrap();
        assert!(all.len() > 2000, "got {}", all.len());
        let last = all.last().unwrap().dtstart.utc_instant().unwrap();
        assert!(last < horizon && last >= horizon - TimeDelta::days(1));

        let capped = ev
            .recurrences(&ExpansionOptions {
                max_instances: Some(30),
                lookahead_days: 7,
            })
            .unwrap();
        assert_eq!(capped.len(), 30);
        assert_eq!(capped.last().unwrap().dtstart, all.last().unwrap().dtstart);
        assert!(capped[0].dtstart.utc_instant().unwrap() > Utc::now() - TimeDelta::days(30));
    }
}
