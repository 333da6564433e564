//! DATE and DATE-TIME values with calendar arithmetic and time zone aware
//! rendering.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Utc};

use super::offset::UtcOffset;
use super::property::names;
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::expand::TimezoneDefinition;
use crate::rfc::ical::parse::values::parse_date_time_text;

/// How a value is anchored in time.
#[derive(Debug, Clone)]
pub enum DateTimeForm {
    /// Local time with no offset information.
    Floating,
    Utc,
    /// Local time in a time zone defined by the document.
    Zoned(Arc<TimezoneDefinition>),
}

impl PartialEq for DateTimeForm {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Floating, Self::Floating) | (Self::Utc, Self::Utc) => true,
            (Self::Zoned(a), Self::Zoned(b)) => a.tzid == b.tzid,
            _ => false,
        }
    }
}

impl Eq for DateTimeForm {}

/// Gregorian leap year rule: divisible by 400, or by 4 but not by 100.
#[must_use]
pub const fn is_leap_year(year: i32) -> bool {
    if year % 400 == 0 {
        true
    } else if year % 100 == 0 {
        false
    } else {
        year % 4 == 0
    }
}

/// Number of days in `month` (1-12) of `year`; 0 for an invalid month.
#[must_use]
pub const fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// A calendar date, or a date with a time of day.
///
/// The time of day is present iff the value is a DATE-TIME. Arithmetic keeps
/// every field calendar-correct; a failed operation leaves the value as it
/// was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeValue {
    date: NaiveDate,
    time: Option<NaiveTime>,
    form: DateTimeForm,
    params: BTreeMap<String, String>,
}

impl DateTimeValue {
    /// Creates a floating DATE.
    ///
    /// ## Errors
    /// Returns [`RfcError::ValueFormatError`] for an impossible date.
    pub fn date(year: i32, month: u32, day: u32) -> RfcResult<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            RfcError::ValueFormatError(format!("invalid date {year:04}-{month:02}-{day:02}"))
        })?;
        Ok(Self {
            date,
            time: None,
            form: DateTimeForm::Floating,
            params: BTreeMap::new(),
        })
    }

    /// Creates a DATE-TIME.
    ///
    /// ## Errors
    /// Returns [`RfcError::ValueFormatError`] for an impossible date or time.
    pub fn date_time(
        (year, month, day): (i32, u32, u32),
        (hour, minute, second): (u32, u32, u32),
        form: DateTimeForm,
    ) -> RfcResult<Self> {
        let mut value = Self::date(year, month, day)?;
        value.time = Some(NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| {
            RfcError::ValueFormatError(format!(
                "invalid time {hour:02}:{minute:02}:{second:02}"
            ))
        })?);
        value.form = form;
        Ok(value)
    }

    /// Creates a DATE-TIME from local clock fields.
    #[must_use]
    pub fn from_naive(naive: NaiveDateTime, form: DateTimeForm) -> Self {
        Self {
            date: naive.date(),
            time: Some(naive.time()),
            form,
            params: BTreeMap::new(),
        }
    }

    /// ## Summary
    /// Parses a property value into a `DateTimeValue`.
    ///
    /// Accepts the compact and the ISO-8601 extended forms. A `Z` suffix (or
    /// an explicit numeric offset) makes the value UTC and discards
    /// `timezone`. `VALUE=DATE` drops any time of day; `VALUE=DATE-TIME` on a
    /// bare date yields midnight. `params` is kept with the value.
    ///
    /// ## Errors
    /// Returns [`RfcError::ValueFormatError`] if the string is not a date or
    /// date-time.
    pub fn parse(
        raw: &str,
        params: &BTreeMap<String, String>,
        timezone: Option<Arc<TimezoneDefinition>>,
    ) -> RfcResult<Self> {
        let text = parse_date_time_text(raw)?;

        let time = match params.get(names::VALUE) {
            Some(value) if value.eq_ignore_ascii_case("DATE") => None,
            Some(value) if value.eq_ignore_ascii_case("DATE-TIME") => {
                Some(text.time.unwrap_or(NaiveTime::MIN))
            }
            _ => text.time,
        };

        let form = if text.utc {
            DateTimeForm::Utc
        } else if let Some(tz) = timezone {
            DateTimeForm::Zoned(tz)
        } else {
            DateTimeForm::Floating
        };

        Ok(Self {
            date: text.date,
            time,
            form,
            params: params.clone(),
        })
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    #[must_use]
    pub fn month(&self) -> u32 {
        self.date.month()
    }

    #[must_use]
    pub fn day(&self) -> u32 {
        self.date.day()
    }

    #[must_use]
    pub fn hour(&self) -> Option<u32> {
        self.time.as_ref().map(Timelike::hour)
    }

    #[must_use]
    pub fn minute(&self) -> Option<u32> {
        self.time.as_ref().map(Timelike::minute)
    }

    #[must_use]
    pub fn second(&self) -> Option<u32> {
        self.time.as_ref().map(Timelike::second)
    }

    #[must_use]
    pub const fn is_date(&self) -> bool {
        self.time.is_none()
    }

    #[must_use]
    pub const fn is_utc(&self) -> bool {
        matches!(self.form, DateTimeForm::Utc)
    }

    #[must_use]
    pub const fn form(&self) -> &DateTimeForm {
        &self.form
    }

    #[must_use]
    pub fn timezone(&self) -> Option<&Arc<TimezoneDefinition>> {
        match &self.form {
            DateTimeForm::Zoned(tz) => Some(tz),
            DateTimeForm::Floating | DateTimeForm::Utc => None,
        }
    }

    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// `DATE` or `DATE-TIME`.
    #[must_use]
    pub const fn value_type(&self) -> &'static str {
        if self.time.is_some() { "DATE-TIME" } else { "DATE" }
    }

    #[must_use]
    pub const fn naive_date(&self) -> NaiveDate {
        self.date
    }

    /// Local clock fields; a DATE reads as midnight.
    #[must_use]
    pub fn naive_local(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.date, self.time.unwrap_or(NaiveTime::MIN))
    }

    /// ## Errors
    /// Returns [`RfcError::ValueFormatError`] if the result leaves chrono's
    /// supported range.
    pub fn add_years(&mut self, years: i32) -> RfcResult<()> {
        let months = years
            .checked_mul(12)
            .ok_or_else(|| out_of_range("years", i64::from(years)))?;
        self.add_months(months)
    }

    /// Adds calendar months, carrying into the year. The day of month is
    /// clamped to the length of the resulting month.
    ///
    /// ## Errors
    /// Returns [`RfcError::ValueFormatError`] if the result leaves chrono's
    /// supported range.
    pub fn add_months(&mut self, months: i32) -> RfcResult<()> {
        let total = i64::from(self.date.year()) * 12
            + i64::from(self.date.month0())
            + i64::from(months);
        let year = i32::try_from(total.div_euclid(12))
            .map_err(|err| RfcError::ValueFormatError(err.to_string()))?;
        let month = u32::try_from(total.rem_euclid(12))
            .map_err(|err| RfcError::ValueFormatError(err.to_string()))?
            + 1;
        let day = self.date.day().min(days_in_month(year, month));

        self.date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| out_of_range("months", i64::from(months)))?;
        Ok(())
    }

    /// ## Errors
    /// Returns [`RfcError::ValueFormatError`] if the result leaves chrono's
    /// supported range.
    pub fn add_days(&mut self, days: i64) -> RfcResult<()> {
        self.date = TimeDelta::try_days(days)
            .and_then(|delta| self.date.checked_add_signed(delta))
            .ok_or_else(|| out_of_range("days", days))?;
        Ok(())
    }

    /// ## Errors
    /// Returns [`RfcError::ValueTypeError`] on a DATE value, or
    /// [`RfcError::ValueFormatError`] if the result is out of range.
    pub fn add_hours(&mut self, hours: i64) -> RfcResult<()> {
        self.add_clock_delta("hours", hours, TimeDelta::try_hours(hours))
    }

    /// ## Errors
    /// Returns [`RfcError::ValueTypeError`] on a DATE value, or
    /// [`RfcError::ValueFormatError`] if the result is out of range.
    pub fn add_minutes(&mut self, minutes: i64) -> RfcResult<()> {
        self.add_clock_delta("minutes", minutes, TimeDelta::try_minutes(minutes))
    }

    /// ## Errors
    /// Returns [`RfcError::ValueTypeError`] on a DATE value, or
    /// [`RfcError::ValueFormatError`] if the result is out of range.
    pub fn add_seconds(&mut self, seconds: i64) -> RfcResult<()> {
        self.add_clock_delta("seconds", seconds, TimeDelta::try_seconds(seconds))
    }

    fn add_clock_delta(&mut self, unit: &str, amount: i64, delta: Option<TimeDelta>) -> RfcResult<()> {
        let Some(time) = self.time else {
            return Err(RfcError::ValueTypeError(format!(
                "cannot add {unit} to DATE value {self}"
            )));
        };
        let next = delta
            .and_then(|delta| NaiveDateTime::new(self.date, time).checked_add_signed(delta))
            .ok_or_else(|| out_of_range(unit, amount))?;
        self.date = next.date();
        self.time = Some(next.time());
        Ok(())
    }

    /// ## Errors
    /// Returns [`RfcError::ValueFormatError`] if the date does not exist in
    /// that year (29 February).
    pub fn set_year(&mut self, year: i32) -> RfcResult<()> {
        self.date = self
            .date
            .with_year(year)
            .ok_or_else(|| invalid_field("year", year))?;
        Ok(())
    }

    /// ## Errors
    /// Returns [`RfcError::ValueFormatError`] for a month outside 1-12 or one
    /// too short for the current day.
    pub fn set_month(&mut self, month: u32) -> RfcResult<()> {
        self.date = self
            .date
            .with_month(month)
            .ok_or_else(|| invalid_field("month", month))?;
        Ok(())
    }

    /// ## Errors
    /// Returns [`RfcError::ValueFormatError`] for a day the month lacks.
    pub fn set_day(&mut self, day: u32) -> RfcResult<()> {
        self.date = self
            .date
            .with_day(day)
            .ok_or_else(|| invalid_field("day", day))?;
        Ok(())
    }

    /// ## Errors
    /// Returns [`RfcError::ValueTypeError`] on a DATE value, or
    /// [`RfcError::ValueFormatError`] for an hour outside 0-23.
    pub fn set_hour(&mut self, hour: u32) -> RfcResult<()> {
        self.set_clock_field("hour", hour, |t| t.with_hour(hour))
    }

    /// ## Errors
    /// Returns [`RfcError::ValueTypeError`] on a DATE value, or
    /// [`RfcError::ValueFormatError`] for a minute outside 0-59.
    pub fn set_minute(&mut self, minute: u32) -> RfcResult<()> {
        self.set_clock_field("minute", minute, |t| t.with_minute(minute))
    }

    /// ## Errors
    /// Returns [`RfcError::ValueTypeError`] on a DATE value, or
    /// [`RfcError::ValueFormatError`] for a second outside 0-59.
    pub fn set_second(&mut self, second: u32) -> RfcResult<()> {
        self.set_clock_field("second", second, |t| t.with_second(second))
    }

    fn set_clock_field(
        &mut self,
        field: &str,
        value: u32,
        apply: impl FnOnce(NaiveTime) -> Option<NaiveTime>,
    ) -> RfcResult<()> {
        let Some(time) = self.time else {
            return Err(RfcError::ValueTypeError(format!(
                "cannot set {field} on DATE value {self}"
            )));
        };
        self.time = Some(apply(time).ok_or_else(|| invalid_field(field, value))?);
        Ok(())
    }

    /// Returns a copy moved by `delta`. A DATE moves by whole days only.
    ///
    /// ## Errors
    /// Returns [`RfcError::ValueFormatError`] if the result is out of range.
    pub fn shifted(&self, delta: TimeDelta) -> RfcResult<Self> {
        let mut value = self.clone();
        if value.is_date() {
            value.add_days(delta.num_days())?;
        } else {
            value.add_seconds(delta.num_seconds())?;
        }
        Ok(value)
    }

    /// Returns a copy carrying the same form and parameters at new local
    /// clock fields. A DATE keeps only the date part.
    #[must_use]
    pub fn with_naive_local(&self, naive: NaiveDateTime) -> Self {
        Self {
            date: naive.date(),
            time: self.time.map(|_| naive.time()),
            form: self.form.clone(),
            params: self.params.clone(),
        }
    }

    /// Sets the time of day to midnight; a no-op for DATE values.
    pub fn truncate_time(&mut self) {
        if self.time.is_some() {
            self.time = Some(NaiveTime::MIN);
        }
    }

    /// ## Summary
    /// Resolves the UTC offset in effect at this value's local time.
    ///
    /// ## Errors
    /// Returns [`RfcError::NoTimezoneError`] for a floating value, or the
    /// time zone's resolution error.
    pub fn resolve_offset(&self) -> RfcResult<UtcOffset> {
        match &self.form {
            DateTimeForm::Utc => Ok(UtcOffset::from_seconds(0)),
            DateTimeForm::Zoned(tz) => tz.resolve_offset(self),
            DateTimeForm::Floating => Err(RfcError::NoTimezoneError(format!(
                "floating value {self} has no offset"
            ))),
        }
    }

    /// ## Summary
    /// Renders `YYYY-MM-DD`, or `YYYY-MM-DDTHH:MM:SS` followed by `Z` (UTC or
    /// zero offset) or `±HH:MM`, in the value's own local time.
    ///
    /// ## Errors
    /// Returns [`RfcError::NoTimezoneError`] for a floating DATE-TIME.
    pub fn to_local_string(&self) -> RfcResult<String> {
        if self.is_date() {
            return Ok(self.date_string());
        }
        let offset = self.resolve_offset()?;
        let suffix = if offset.seconds == 0 {
            "Z".to_string()
        } else {
            offset.to_colon_string()
        };
        Ok(format!("{}{suffix}", self.naive_local().format("%Y-%m-%dT%H:%M:%S")))
    }

    /// ## Summary
    /// Renders the value normalized to UTC (`YYYY-MM-DDTHH:MM:SSZ`), or
    /// `YYYY-MM-DD` for a DATE.
    ///
    /// ## Errors
    /// Returns [`RfcError::NoTimezoneError`] for a floating DATE-TIME.
    pub fn to_utc_string(&self) -> RfcResult<String> {
        if self.is_date() {
            return Ok(self.date_string());
        }
        Ok(self.utc_instant()?.format("%Y-%m-%dT%H:%M:%SZ").to_string())
    }

    /// Local clock rendering without any offset: `YYYY-MM-DD` or
    /// `YYYY-MM-DDTHH:MM:SS`, with a trailing `Z` only for UTC values.
    #[must_use]
    pub fn to_wall_clock_string(&self) -> String {
        if self.is_date() {
            return self.date_string();
        }
        let mut rendered = self.naive_local().format("%Y-%m-%dT%H:%M:%S").to_string();
        if self.is_utc() {
            rendered.push('Z');
        }
        rendered
    }

    /// ## Summary
    /// The UTC instant this value denotes. A DATE stands for its midnight;
    /// a floating DATE is read as UTC midnight.
    ///
    /// ## Errors
    /// Returns [`RfcError::NoTimezoneError`] for a floating DATE-TIME.
    pub fn utc_instant(&self) -> RfcResult<DateTime<Utc>> {
        let local = self.naive_local();
        let offset = match &self.form {
            DateTimeForm::Floating if self.is_date() => UtcOffset::from_seconds(0),
            _ => self.resolve_offset()?,
        };
        local
            .checked_sub_signed(offset.as_time_delta())
            .map(|naive| naive.and_utc())
            .ok_or_else(|| out_of_range("offset seconds", i64::from(offset.seconds)))
    }

    /// Like [`Self::utc_instant`], but reads a floating DATE-TIME as if it
    /// were UTC.
    pub(crate) fn window_instant(&self) -> RfcResult<DateTime<Utc>> {
        match self.form {
            DateTimeForm::Floating => Ok(self.naive_local().and_utc()),
            DateTimeForm::Utc | DateTimeForm::Zoned(_) => self.utc_instant(),
        }
    }

    /// ## Summary
    /// Orders two values by their UTC instants; a DATE compares at midnight.
    ///
    /// ## Errors
    /// Returns [`RfcError::NoTimezoneError`] if either side is a floating
    /// DATE-TIME.
    pub fn compare(&self, other: &Self) -> RfcResult<Ordering> {
        Ok(self.utc_instant()?.cmp(&other.utc_instant()?))
    }

    fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for DateTimeValue {
    /// Compact iCalendar form: `YYYYMMDD` or `YYYYMMDDTHHMMSS[Z]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date.format("%Y%m%d"))?;
        if let Some(time) = self.time {
            write!(f, "T{}", time.format("%H%M%S"))?;
            if self.is_utc() {
                f.write_str("Z")?;
            }
        }
        Ok(())
    }
}

fn out_of_range(unit: &str, amount: i64) -> RfcError {
    RfcError::ValueFormatError(format!("adding {amount} {unit} leaves the supported range"))
}

fn invalid_field(field: &str, value: impl fmt::Display) -> RfcError {
    RfcError::ValueFormatError(format!("invalid {field} {value}"))
}
