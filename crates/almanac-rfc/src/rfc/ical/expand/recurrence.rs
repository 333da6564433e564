//! Recurrence rules evaluated by the `rrule` crate.
//!
//! Rules are evaluated in wall-clock space: the anchor's local clock fields
//! are handed to the evaluator as if they were UTC, and the instants it
//! returns are read back the same way. Callers convert those clock values
//! through whatever time zone the anchor belongs to.

use chrono::NaiveDateTime;
use rrule::RRuleSet;

use super::vtimezone::TimezoneDefinition;
use crate::error::{RfcError, RfcResult};
use crate::rfc::ical::parse::values::parse_date_time_text;

const RRULE_STAMP: &str = "%Y%m%dT%H%M%SZ";

/// An RRULE bound to its DTSTART anchor.
#[derive(Debug, Clone)]
pub struct RecurrenceRule {
    rule: String,
    anchor: NaiveDateTime,
    set: RRuleSet,
}

impl RecurrenceRule {
    /// ## Summary
    /// Builds a rule anchored at the given local clock fields.
    ///
    /// An `UNTIL` part is rewritten into the evaluator's clock space: a bare
    /// date becomes the last second of that day, a local date-time is taken
    /// as-is, and a UTC date-time is converted into `zone`'s local time when
    /// a zone is given.
    ///
    /// ## Errors
    /// Returns [`RfcError::ValueFormatError`] if the rule or its `UNTIL` does
    /// not parse or fails the evaluator's validation.
    pub fn new(
        rule: &str,
        anchor: NaiveDateTime,
        zone: Option<&TimezoneDefinition>,
    ) -> RfcResult<Self> {
        let rule = normalize_rule(rule, zone)?;
        let text = anchor_text(anchor, &rule);

        let set = text
            .parse::<RRuleSet>()
            .map_err(|err| {
                RfcError::ValueFormatError(format!("invalid recurrence rule '{rule}': {err}"))
            })?
            .limit();

        tracing::trace!(%rule, %anchor, "Built recurrence rule");

        Ok(Self { rule, anchor, set })
    }

    /// The rule text after `UNTIL` normalization, without the `RRULE:` prefix.
    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    #[must_use]
    pub const fn anchor(&self) -> NaiveDateTime {
        self.anchor
    }

    /// The `DTSTART:...\nRRULE:...` text handed to the evaluator.
    #[must_use]
    pub fn anchor_string(&self) -> String {
        anchor_text(self.anchor, &self.rule)
    }

    /// ## Summary
    /// Returns every occurrence in `[from, until)`, ascending.
    ///
    /// The window is the only bound on the result. Each call evaluates the
    /// rule afresh.
    ///
    /// ## Errors
    /// Returns [`RfcError::RecurrenceWindowError`] if `until <= from`.
    pub fn between(
        &self,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> RfcResult<Vec<NaiveDateTime>> {
        check_window(from, until)?;
        let dates: Vec<_> = self.occurrences(from, until).collect();
        tracing::trace!(rule = %self.rule, count = dates.len(), "Evaluated recurrence window");
        Ok(dates)
    }

    /// ## Summary
    /// Returns the first occurrence in `[from, until)`, if any.
    ///
    /// ## Errors
    /// Returns [`RfcError::RecurrenceWindowError`] if `until <= from`.
    pub fn first_between(
        &self,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> RfcResult<Option<NaiveDateTime>> {
        check_window(from, until)?;
        Ok(self.occurrences(from, until).next())
    }

    /// Lazily walks the rule set. The evaluator's loop guard stops rules
    /// that never produce another date.
    fn occurrences(
        &self,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.set
            .into_iter()
            .map(|dt| dt.naive_utc())
            .skip_while(move |dt| *dt < from)
            .take_while(move |dt| *dt < until)
    }
}

fn check_window(from: NaiveDateTime, until: NaiveDateTime) -> RfcResult<()> {
    if until <= from {
        return Err(RfcError::RecurrenceWindowError(format!(
            "window end {until} is not after its start {from}"
        )));
    }
    Ok(())
}

fn anchor_text(anchor: NaiveDateTime, rule: &str) -> String {
    format!("DTSTART:{}\nRRULE:{rule}", anchor.format(RRULE_STAMP))
}

fn normalize_rule(rule: &str, zone: Option<&TimezoneDefinition>) -> RfcResult<String> {
    let rule = rule.trim();
    let rule = rule.strip_prefix("RRULE:").unwrap_or(rule);

    let parts = rule
        .split(';')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("UNTIL") => {
                Ok(format!("UNTIL={}", normalize_until(value, zone)?))
            }
            _ => Ok(part.to_string()),
        })
        .collect::<RfcResult<Vec<_>>>()?;

    Ok(parts.join(";"))
}

fn normalize_until(value: &str, zone: Option<&TimezoneDefinition>) -> RfcResult<String> {
    let text = parse_date_time_text(value)?;

    let local = match (text.time, zone) {
        (None, _) => text.date.and_hms_opt(23, 59, 59).ok_or_else(|| {
            RfcError::ValueFormatError(format!("invalid UNTIL value '{value}'"))
        })?,
        (Some(time), Some(zone)) if text.utc => zone.utc_to_local(text.date.and_time(time))?,
        (Some(time), _) => text.date.and_time(time),
    };

    Ok(local.format(RRULE_STAMP).to_string())
}
