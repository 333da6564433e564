//! VTIMEZONE definitions and UTC offset resolution.

use std::fmt;

use chrono::{Months, NaiveDateTime};

use super::recurrence::RecurrenceRule;
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::core::{
    Component, ComponentKind, DateTimeForm, DateTimeValue, PropertyValue, UtcOffset, names,
};
use crate::rfc::ical::parse::error::{ParseError, ParseErrorKind};
use crate::rfc::ical::parse::values::parse_utc_offset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservanceKind {
    Standard,
    Daylight,
}

impl ObservanceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Daylight => "DAYLIGHT",
        }
    }
}

impl fmt::Display for ObservanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A STANDARD or DAYLIGHT sub-component.
///
/// `dtstart` is floating: it is read in the local time of the zone that owns
/// the observance.
#[derive(Debug, Clone)]
pub struct Observance {
    pub kind: ObservanceKind,
    pub dtstart: DateTimeValue,
    pub offset_to: Option<UtcOffset>,
    pub offset_from: Option<UtcOffset>,
    pub rrule: Option<RecurrenceRule>,
    pub tzname: Option<String>,
}

impl Observance {
    /// ## Summary
    /// Builds an observance from its sub-component.
    ///
    /// ## Errors
    /// Returns [`RfcError::StructureError`] when DTSTART is missing, and
    /// value errors for a malformed DTSTART, offset or RRULE.
    pub fn from_component(component: &Component, kind: ObservanceKind, tzid: &str) -> RfcResult<Self> {
        let dtstart_prop = component.get_property(names::DTSTART).ok_or_else(|| {
            ParseError::new(ParseErrorKind::MissingRequiredProperty, component.line, 0)
                .with_context(format!("{kind} in VTIMEZONE '{tzid}' is missing DTSTART"))
        })?;

        let parsed = DateTimeValue::parse(&dtstart_prop.joined(), &dtstart_prop.params, None)?;
        let dtstart = DateTimeValue::from_naive(parsed.naive_local(), DateTimeForm::Floating);

        let offset = |key: &str| -> RfcResult<Option<UtcOffset>> {
            component
                .get_property(key)
                .map(|prop| parse_utc_offset(&prop.joined()))
                .transpose()
        };
        let offset_to = offset(names::TZOFFSETTO)?;
        let offset_from = offset(names::TZOFFSETFROM)?;

        let rrule = component
            .get_property(names::RRULE)
            .map(|prop| RecurrenceRule::new(&prop.joined(), dtstart.naive_local(), None))
            .transpose()?;

        Ok(Self {
            kind,
            dtstart,
            offset_to,
            offset_from,
            rrule,
            tzname: component.get_property(names::TZNAME).map(PropertyValue::joined),
        })
    }

    /// ## Summary
    /// The first transition into this observance inside `[from, until)`.
    ///
    /// Without a rule the single transition is DTSTART itself, wherever it
    /// falls.
    ///
    /// ## Errors
    /// Propagates recurrence evaluation errors.
    pub fn next_transition(
        &self,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> RfcResult<Option<NaiveDateTime>> {
        match &self.rrule {
            Some(rule) => rule.first_between(from, until),
            None => Ok(Some(self.dtstart.naive_local())),
        }
    }
}

/// A VTIMEZONE: a TZID with its STANDARD and DAYLIGHT observances.
///
/// Only the first observance of each kind is kept.
#[derive(Debug, Clone)]
pub struct TimezoneDefinition {
    pub tzid: String,
    pub standard: Option<Observance>,
    pub daylight: Option<Observance>,
    pub tzurl: Option<String>,
    pub last_modified: Option<String>,
}

impl TimezoneDefinition {
    /// ## Summary
    /// Builds a definition from a VTIMEZONE component.
    ///
    /// ## Errors
    /// Returns [`RfcError::StructureError`] when TZID or an observance's
    /// DTSTART is missing.
    pub fn from_component(component: &Component) -> RfcResult<Self> {
        let tzid = component
            .get_property(names::TZID)
            .map(PropertyValue::joined)
            .ok_or_else(|| {
                ParseError::new(ParseErrorKind::MissingRequiredProperty, component.line, 0)
                    .with_context("VTIMEZONE is missing TZID")
            })?;

        let observance = |kind: ObservanceKind, component_kind: ComponentKind| {
            component
                .first_child(component_kind)
                .map(|child| Observance::from_component(child, kind, &tzid))
                .transpose()
        };
        let standard = observance(ObservanceKind::Standard, ComponentKind::Standard)?;
        let daylight = observance(ObservanceKind::Daylight, ComponentKind::Daylight)?;

        tracing::debug!(
            %tzid,
            has_standard = standard.is_some(),
            has_daylight = daylight.is_some(),
            "Built time zone definition"
        );

        Ok(Self {
            tzurl: component.get_property(names::TZURL).map(PropertyValue::joined),
            last_modified: component.get_property(names::LAST_MODIFIED).map(PropertyValue::joined),
            tzid,
            standard,
            daylight,
        })
    }

    /// A zone with a single STANDARD observance at a fixed offset.
    #[must_use]
    pub fn fixed(tzid: impl Into<String>, offset: UtcOffset) -> Self {
        Self {
            tzid: tzid.into(),
            standard: Some(Observance {
                kind: ObservanceKind::Standard,
                dtstart: DateTimeValue::from_naive(NaiveDateTime::UNIX_EPOCH, DateTimeForm::Floating),
                offset_to: Some(offset),
                offset_from: Some(offset),
                rrule: None,
                tzname: None,
            }),
            daylight: None,
            tzurl: None,
            last_modified: None,
        }
    }

    /// ## Summary
    /// Resolves the offset in effect at `value`'s local clock time.
    ///
    /// ## Errors
    /// See [`Self::offset_at`].
    pub fn resolve_offset(&self, value: &DateTimeValue) -> RfcResult<UtcOffset> {
        self.offset_at(value.naive_local())
    }

    /// ## Summary
    /// Resolves the offset in effect at a local clock time.
    ///
    /// Both observances are probed for their next transition in the year
    /// starting at `local`. The zone is counting down to whichever comes
    /// first, so the other one is in effect now: DAYLIGHT when STANDARD's
    /// transition is strictly earlier, STANDARD otherwise (including ties
    /// and an observance with no transition in the window). A zone with a
    /// single usable observance always uses it.
    ///
    /// ## Errors
    /// Returns [`RfcError::AmbiguousTimezoneError`] when neither observance
    /// carries TZOFFSETTO.
    pub fn offset_at(&self, local: NaiveDateTime) -> RfcResult<UtcOffset> {
        let standard = self.standard.as_ref().filter(|o| o.offset_to.is_some());
        let daylight = self.daylight.as_ref().filter(|o| o.offset_to.is_some());

        let (standard, daylight) = match (standard, daylight) {
            (Some(standard), Some(daylight)) => (standard, daylight),
            (Some(only), None) | (None, Some(only)) => {
                return only.offset_to.ok_or_else(|| self.ambiguous());
            }
            (None, None) => return Err(self.ambiguous()),
        };

        let until = local
            .checked_add_months(Months::new(12))
            .ok_or_else(|| RfcError::ValueFormatError(format!("probe window after {local} overflows")))?;

        let next_standard = standard.next_transition(local, until)?;
        let next_daylight = daylight.next_transition(local, until)?;

        let active = match (next_standard, next_daylight) {
            (Some(s), Some(d)) if s < d => daylight,
            _ => standard,
        };

        tracing::trace!(
            tzid = %self.tzid,
            %local,
            ?next_standard,
            ?next_daylight,
            active = %active.kind,
            "Resolved time zone offset"
        );

        active.offset_to.ok_or_else(|| self.ambiguous())
    }

    /// Signed hour part of the offset at `value`.
    ///
    /// ## Errors
    /// See [`Self::offset_at`].
    pub fn hour_offset(&self, value: &DateTimeValue) -> RfcResult<i32> {
        Ok(self.resolve_offset(value)?.hours())
    }

    /// Signed minute part of the offset at `value`.
    ///
    /// ## Errors
    /// See [`Self::offset_at`].
    pub fn minute_offset(&self, value: &DateTimeValue) -> RfcResult<i32> {
        Ok(self.resolve_offset(value)?.minutes())
    }

    /// The offset at `value` as `±HH:MM`.
    ///
    /// ## Errors
    /// See [`Self::offset_at`].
    pub fn offset_string(&self, value: &DateTimeValue) -> RfcResult<String> {
        Ok(self.resolve_offset(value)?.to_colon_string())
    }

    /// ## Errors
    /// See [`Self::offset_at`].
    pub fn local_to_utc(&self, local: NaiveDateTime) -> RfcResult<NaiveDateTime> {
        let offset = self.offset_at(local)?;
        local
            .checked_sub_signed(offset.as_time_delta())
            .ok_or_else(|| RfcError::ValueFormatError(format!("{local} leaves the supported range")))
    }

    /// ## Summary
    /// Converts a UTC clock value into this zone's local time.
    ///
    /// The offset is looked up at the UTC value shifted by a first guess, then
    /// once more at the refined local time, which settles every instant not
    /// within an hour of a transition.
    ///
    /// ## Errors
    /// See [`Self::offset_at`].
    pub fn utc_to_local(&self, utc: NaiveDateTime) -> RfcResult<NaiveDateTime> {
        let shift = |offset: UtcOffset| {
            utc.checked_add_signed(offset.as_time_delta())
                .ok_or_else(|| RfcError::ValueFormatError(format!("{utc} leaves the supported range")))
        };
        let guess = shift(self.offset_at(utc)?)?;
        shift(self.offset_at(guess)?)
    }

    fn ambiguous(&self) -> RfcError {
        RfcError::AmbiguousTimezoneError(format!(
            "time zone '{}' has no observance with TZOFFSETTO",
            self.tzid
        ))
    }
}
