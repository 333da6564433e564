use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// How an event with a DATE-TIME start but neither DTEND nor DURATION is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum DefaultEndPolicy {
    /// Midnight at the start of the following day.
    #[default]
    NextDay,
    /// The end equals the start.
    ZeroDuration,
}

impl DefaultEndPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NextDay => "next_day",
            Self::ZeroDuration => "zero_duration",
        }
    }

    /// Parses a policy name, ignoring case and surrounding whitespace.
    ///
    /// ## Errors
    /// Returns [`CoreError::InvalidInput`] for an unrecognized policy name.
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "next_day" => Ok(Self::NextDay),
            "zero_duration" => Ok(Self::ZeroDuration),
            other => Err(CoreError::InvalidInput(format!(
                "unknown default end policy '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for DefaultEndPolicy {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        Self::parse(&value)
    }
}

impl std::fmt::Display for DefaultEndPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
