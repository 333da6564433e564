use thiserror::Error;

use crate::rfc::ical::parse::error::ParseError;

/// Errors raised while parsing calendar text or computing with its values.
#[derive(Error, Debug)]
pub enum RfcError {
    /// Malformed component nesting or a missing required property.
    #[error("Structure error: {0}")]
    StructureError(#[from] ParseError),

    /// A date, time, offset, duration or rule string that does not parse.
    #[error("Value format error: {0}")]
    ValueFormatError(String),

    /// An operation that needs a time of day applied to a DATE value.
    #[error("Value type error: {0}")]
    ValueTypeError(String),

    #[error("No time zone was specified: {0}")]
    NoTimezoneError(String),

    #[error("Ambiguous time zone: {0}")]
    AmbiguousTimezoneError(String),

    /// A reversed or empty expansion window.
    #[error("Recurrence window error: {0}")]
    RecurrenceWindowError(String),

    #[error(transparent)]
    CoreError(#[from] almanac_core::error::CoreError),
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
