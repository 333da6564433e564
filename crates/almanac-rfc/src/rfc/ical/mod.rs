//! iCalendar (RFC 5545) reading, time zone resolution and recurrence
//! expansion.
//!
//! Text flows through [`parse`] into a generic component tree, which
//! [`core::CalendarDocument`] turns into typed time zones and events.
//! [`expand`] holds the time zone and recurrence machinery those types lean
//! on, and [`normalize`] renders events into the flat record consumed by
//! downstream hosts.

pub mod core;
pub mod expand;
pub mod legacy;
pub mod normalize;
pub mod parse;

pub use self::core::{CalendarDocument, DateTimeForm, DateTimeValue, EventComponent};
pub use expand::{ExpansionOptions, ParseOptions, RecurrenceRule, TimezoneDefinition};
pub use normalize::{NormalizedEvent, TimedRecord, normalize_event};
