//! End-to-end behavior of parsing, date arithmetic, time zone resolution
//! and recurrence expansion through the public API.

use almanac_rfc::error::RfcError;
use almanac_rfc::rfc::ical::core::{ComponentKind, PropertyValues, UtcOffset, names};
use almanac_rfc::rfc::ical::parse::parse;
use almanac_rfc::rfc::ical::{
    CalendarDocument, DateTimeForm, DateTimeValue, EventComponent, ExpansionOptions,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

const BERLIN_TZ: &str = "BEGIN:VTIMEZONE\r\n\
TZID:Europe/Berlin\r\n\
BEGIN:DAYLIGHT\r\n\
TZOFFSETFROM:+0100\r\n\
TZOFFSETTO:+0200\r\n\
TZNAME:CEST\r\n\
DTSTART:19700329T020000\r\n\
RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU\r\n\
END:DAYLIGHT\r\n\
BEGIN:STANDARD\r\n\
TZOFFSETFROM:+0200\r\n\
TZOFFSETTO:+0100\r\n\
TZNAME:CET\r\n\
DTSTART:19701025T030000\r\n\
RRULE:FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU\r\n\
END:STANDARD\r\n\
END:VTIMEZONE\r\n";

fn calendar(body: &str) -> String {
    format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Almanac//Tests//EN\r\n{body}END:VCALENDAR\r\n")
}

fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
        .single()
        .expect("valid test instant")
}

/// ## Summary
/// Adding and then subtracting the same number of days restores the date.
#[test_log::test]
fn day_arithmetic_round_trips() {
    let starts = [(2024, 2, 29), (1999, 12, 31), (2000, 1, 1), (1970, 6, 15)];
    let deltas = [1_i64, -1, 40, -365, 1461, 36_524, -99_999, 99_999];

    for (y, m, d) in starts {
        for n in deltas {
            let original = DateTimeValue::date(y, m, d).expect("valid date");
            let mut value = original.clone();
            value.add_days(n).expect("forward");
            value.add_days(-n).expect("backward");
            assert_eq!(value, original, "{y}-{m}-{d} with {n} days");
        }
    }
}

/// ## Summary
/// February rolls over according to the Gregorian leap year rule.
#[test_log::test]
fn leap_years_follow_gregorian_rule() {
    let cases = [
        ((2024, 2, 28), (2024, 2, 29)),
        ((2023, 2, 28), (2023, 3, 1)),
        ((2000, 2, 28), (2000, 2, 29)),
        ((1900, 2, 28), (1900, 3, 1)),
    ];

    for ((y, m, d), (ey, em, ed)) in cases {
        let mut value = DateTimeValue::date(y, m, d).expect("valid date");
        value.add_days(1).expect("add a day");
        assert_eq!((value.year(), value.month(), value.day()), (ey, em, ed));
    }
}

/// ## Summary
/// Adding 40 days carries across month and year boundaries.
#[test_log::test]
fn day_overflow_carries_into_year() {
    let mut value = DateTimeValue::date(2023, 12, 1).expect("valid date");
    value.add_days(40).expect("add days");
    assert_eq!((value.year(), value.month(), value.day()), (2024, 1, 10));
}

/// ## Summary
/// A folded line is unfolded without inserting extra whitespace.
#[test_log::test]
fn folded_lines_are_joined() {
    let text = calendar(
        "BEGIN:VEVENT\r\nDTSTART:20240101\r\nSUMMARY:Long text that wra\r\n ps across lines\r\nEND:VEVENT\r\n",
    );

    let root = parse(&text).expect("parse");
    let event = root.first_child(ComponentKind::Event).expect("event");
    let summary = event.get_property(names::SUMMARY).expect("summary");
    assert_eq!(
        summary.value,
        PropertyValues::Single("Long text that wraps across lines".to_string())
    );

    let document = CalendarDocument::parse(&text).expect("document");
    assert_eq!(document.events[0].summary(), "Long text that wraps across lines");
}

/// ## Summary
/// An all-day event without DTEND or DURATION spans exactly one day.
#[test_log::test]
fn all_day_event_gets_next_day_end() {
    let document =
        CalendarDocument::parse(&calendar("BEGIN:VEVENT\r\nDTSTART:20240101\r\nEND:VEVENT\r\n"))
            .expect("document");

    let record = document.events[0].normalize();
    assert_eq!(record.start_time, "2024-01-01");
    assert_eq!(record.end_time, "2024-01-02");
}

/// ## Summary
/// DURATION is added to DTSTART to derive the end.
#[test_log::test]
fn duration_derives_end() {
    let document = CalendarDocument::parse(&calendar(
        "BEGIN:VEVENT\r\nDTSTART:20240101T100000\r\nDURATION:PT2H30M\r\nEND:VEVENT\r\n",
    ))
    .expect("document");

    assert_eq!(document.events[0].normalize().end_time, "2024-01-01T12:30:00");
}

/// ## Summary
/// A two-observance zone resolves to daylight time in July and standard time
/// in January.
#[test_log::test]
fn timezone_selects_observance_by_season() {
    let document = CalendarDocument::parse(&calendar(BERLIN_TZ)).expect("document");
    let berlin = document.timezone("Europe/Berlin").expect("zone").clone();

    let july = DateTimeValue::date_time((2024, 7, 15), (12, 0, 0), DateTimeForm::Zoned(berlin.clone()))
        .expect("july");
    let january = DateTimeValue::date_time((2024, 1, 15), (12, 0, 0), DateTimeForm::Zoned(berlin.clone()))
        .expect("january");

    assert_eq!(berlin.resolve_offset(&july).expect("offset"), UtcOffset::new(2, 0, 0));
    assert_eq!(berlin.resolve_offset(&january).expect("offset"), UtcOffset::new(1, 0, 0));
    assert_eq!(july.to_local_string().expect("render"), "2024-07-15T12:00:00+02:00");
    assert_eq!(january.to_utc_string().expect("render"), "2024-01-15T11:00:00Z");
}

/// ## Summary
/// A weekly rule with COUNT=3 yields exactly three instances that keep the
/// original duration.
#[test_log::test]
fn weekly_count_expands_to_three() {
    let document = CalendarDocument::parse(&calendar(
        "BEGIN:VEVENT\r\nUID:weekly\r\nDTSTART:20240101\r\nDTEND:20240102\r\nRRULE:FREQ=WEEKLY;COUNT=3\r\nEND:VEVENT\r\n",
    ))
    .expect("document");

    let instances = document.events[0]
        .recurrences_between(utc(2024, 1, 1), utc(2025, 1, 1))
        .expect("expansion");

    let records: Vec<_> = instances.iter().map(EventComponent::normalize).collect();
    let spans: Vec<_> = records
        .iter()
        .map(|r| (r.start_time.as_str(), r.end_time.as_str()))
        .collect();
    assert_eq!(
        spans,
        vec![
            ("2024-01-01", "2024-01-02"),
            ("2024-01-08", "2024-01-09"),
            ("2024-01-15", "2024-01-16"),
        ]
    );
}

/// ## Summary
/// A reversed or empty window is rejected before anything is evaluated.
#[test_log::test]
fn invalid_window_is_rejected() {
    let document = CalendarDocument::parse(&calendar(
        "BEGIN:VEVENT\r\nDTSTART:20240101\r\nRRULE:FREQ=DAILY\r\nEND:VEVENT\r\n",
    ))
    .expect("document");
    let event = &document.events[0];

    assert!(matches!(
        event.recurrences_between(utc(2025, 1, 1), utc(2024, 1, 1)),
        Err(RfcError::RecurrenceWindowError(_))
    ));
    assert!(matches!(
        event.recurrences_between(utc(2024, 1, 1), utc(2024, 1, 1)),
        Err(RfcError::RecurrenceWindowError(_))
    ));
}

/// ## Summary
/// An unclosed VEVENT fails the whole parse.
#[test_log::test]
fn unclosed_event_fails_parse() {
    let text = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nDTSTART:20240101\r\n";

    assert!(matches!(
        CalendarDocument::parse(text),
        Err(RfcError::StructureError(_))
    ));
}

/// ## Summary
/// Zoned recurrences stay on the local clock across a DST change while their
/// UTC instants shift by an hour.
#[test_log::test]
fn zoned_recurrence_keeps_local_time_across_dst() {
    let document = CalendarDocument::parse(&calendar(&format!(
        "{BERLIN_TZ}BEGIN:VEVENT\r\nUID:weekly-sync\r\nDTSTART;TZID=Europe/Berlin:20240328T090000\r\nDTEND;TZID=Europe/Berlin:20240328T100000\r\nRRULE:FREQ=WEEKLY;COUNT=2\r\nEND:VEVENT\r\n"
    )))
    .expect("document");

    let instances = document.events[0]
        .recurrences_between(utc(2024, 3, 1), utc(2024, 5, 1))
        .expect("expansion");
    assert_eq!(instances.len(), 2);

    let utc_starts: Vec<_> = instances
        .iter()
        .map(|e| e.dtstart.to_utc_string().expect("render"))
        .collect();
    assert_eq!(utc_starts, vec!["2024-03-28T08:00:00Z", "2024-04-04T07:00:00Z"]);

    assert_eq!(instances[1].end_time().expect("render"), "2024-04-04T10:00:00+02:00");
}

/// ## Summary
/// Floating date-times cannot be rendered with an offset.
#[test_log::test]
fn floating_time_has_no_offset() {
    let value = DateTimeValue::date_time((2024, 1, 1), (9, 0, 0), DateTimeForm::Floating)
        .expect("value");

    assert!(matches!(value.to_local_string(), Err(RfcError::NoTimezoneError(_))));
    assert!(matches!(value.to_utc_string(), Err(RfcError::NoTimezoneError(_))));
}

/// ## Summary
/// Without a cap the window alone bounds an open-ended rule.
#[test_log::test]
fn open_rule_fills_the_whole_window() {
    let document = CalendarDocument::parse(&calendar(
        "BEGIN:VEVENT\r\nDTSTART:20240101T000000Z\r\nRRULE:FREQ=HOURLY\r\nEND:VEVENT\r\n",
    ))
    .expect("document");

    let instances = document.events[0]
        .recurrences_between(utc(2024, 1, 1), utc(2024, 3, 1))
        .expect("expansion");
    assert_eq!(instances.len(), 1440);
    assert_eq!(
        instances[1439].dtstart.utc_instant().expect("instant"),
        utc(2024, 3, 1) - TimeDelta::hours(1)
    );
}

/// ## Summary
/// A configured instance cap bounds an open-ended rule.
#[test_log::test]
fn instance_cap_bounds_open_rule() {
    let document = CalendarDocument::parse(&calendar(
        "BEGIN:VEVENT\r\nDTSTART:20240101T000000Z\r\nRRULE:FREQ=HOURLY\r\nEND:VEVENT\r\n",
    ))
    .expect("document");
    let options = ExpansionOptions {
        max_instances: Some(24),
        lookahead_days: 1,
    };

    let instances = document.events[0]
        .recurrences_between_with(utc(2024, 1, 1), utc(2024, 2, 1), &options)
        .expect("expansion");
    assert_eq!(instances.len(), 24);
    assert_eq!(
        instances[23].dtstart.utc_instant().expect("instant") - utc(2024, 1, 1),
        TimeDelta::hours(23)
    );
}
