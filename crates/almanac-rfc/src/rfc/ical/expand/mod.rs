//! Time zone resolution and recurrence evaluation.

pub mod options;
pub mod recurrence;
pub mod timezone;
pub mod vtimezone;

pub use options::{ExpansionOptions, ParseOptions};
pub use recurrence::RecurrenceRule;
pub use timezone::{TimezoneTable, build_timezone_table};
pub use vtimezone::{Observance, ObservanceKind, TimezoneDefinition};
