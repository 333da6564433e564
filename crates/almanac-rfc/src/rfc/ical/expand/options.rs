//! Knobs for document construction and recurrence expansion.

use almanac_core::constants::DEFAULT_LOOKAHEAD_DAYS;
use almanac_core::types::DefaultEndPolicy;

/// Options applied while building typed components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// DTEND of a DATE-TIME event that has neither DTEND nor DURATION.
    pub default_end: DefaultEndPolicy,
}

/// Bounds applied to recurrence expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionOptions {
    /// Optional cap on instances returned by one expansion call. Unset, the
    /// window alone bounds the result.
    pub max_instances: Option<u16>,
    /// Horizon used when no end of window is given.
    pub lookahead_days: u32,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            max_instances: None,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
        }
    }
}
