//! Content lines and the property values built from them.

use std::collections::BTreeMap;

/// Canonical property and parameter keys.
///
/// Keys are derived from the iCalendar names by [`canonical_name`].
pub mod names {
    pub const BEGIN: &str = "begin";
    pub const END: &str = "end";

    pub const PRODID: &str = "prodid";
    pub const VERSION: &str = "version";
    pub const CALSCALE: &str = "calscale";
    pub const METHOD: &str = "method";

    pub const UID: &str = "uid";
    pub const SUMMARY: &str = "summary";
    pub const DESCRIPTION: &str = "description";
    pub const STATUS: &str = "status";
    pub const SEQUENCE: &str = "sequence";
    pub const CLASS: &str = "class";
    pub const LOCATION: &str = "location";
    pub const TRANSP: &str = "transp";
    pub const CREATED: &str = "created";
    pub const DTSTAMP: &str = "dtstamp";
    pub const LAST_MODIFIED: &str = "lastModified";
    pub const DTSTART: &str = "dtstart";
    pub const DTEND: &str = "dtend";
    pub const DURATION: &str = "duration";
    pub const RRULE: &str = "rrule";

    pub const TZID: &str = "tzid";
    pub const TZURL: &str = "tzurl";
    pub const TZNAME: &str = "tzname";
    pub const TZOFFSETTO: &str = "tzoffsetto";
    pub const TZOFFSETFROM: &str = "tzoffsetfrom";

    /// `VALUE` parameter.
    pub const VALUE: &str = "value";
}

/// Converts an iCalendar name into its canonical key.
///
/// The first hyphen-separated segment is lowercased, later segments are
/// capitalized: `LAST-MODIFIED` becomes `lastModified`, `VEVENT` becomes
/// `vevent`.
#[must_use]
pub fn canonical_name(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for (index, segment) in name.split('-').filter(|s| !s.is_empty()).enumerate() {
        if index == 0 {
            key.push_str(&segment.to_ascii_lowercase());
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            key.push(first.to_ascii_uppercase());
            key.push_str(&chars.as_str().to_ascii_lowercase());
        }
    }
    key
}

/// A property parameter as written, e.g. `TZID=Europe/Berlin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name (normalized to uppercase).
    pub name: String,
    pub values: Vec<String>,
}

impl Parameter {
    #[must_use]
    pub fn with_values(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            values,
        }
    }

    /// Returns the first value.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

/// A raw content line after unfolding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    /// Property name (normalized to uppercase).
    pub name: String,
    pub params: Vec<Parameter>,
    /// Everything after the first unquoted colon, still escaped.
    pub raw_value: String,
}

impl ContentLine {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            params: Vec::new(),
            raw_value: value.into(),
        }
    }

    /// Converts this line into a [`PropertyValue`] with canonical keys.
    #[must_use]
    pub fn into_property(self) -> PropertyValue {
        let params = self
            .params
            .into_iter()
            .map(|p| (canonical_name(&p.name), p.values.join(",")))
            .collect();

        let mut parts = split_unescaped(&self.raw_value, ',');
        let value = if parts.len() > 1 {
            PropertyValues::List(parts)
        } else {
            PropertyValues::Single(parts.pop().unwrap_or_default())
        };

        PropertyValue {
            name: canonical_name(&self.name),
            params,
            value,
        }
    }
}

/// A parsed property: canonical name, canonical parameters and the value
/// split on unescaped commas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue {
    pub name: String,
    pub params: BTreeMap<String, String>,
    pub value: PropertyValues,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValues {
    Single(String),
    List(Vec<String>),
}

impl PropertyValue {
    /// Returns a parameter by canonical key.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns the scalar value, or `None` for a list.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            PropertyValues::Single(value) => Some(value),
            PropertyValues::List(_) => None,
        }
    }

    /// Returns the value with list items rejoined by commas.
    #[must_use]
    pub fn joined(&self) -> String {
        match &self.value {
            PropertyValues::Single(value) => value.clone(),
            PropertyValues::List(values) => values.join(","),
        }
    }

    /// Iterates over the individual values.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match &self.value {
            PropertyValues::Single(value) => std::slice::from_ref(value),
            PropertyValues::List(values) => values,
        };
        slice.iter().map(String::as_str)
    }
}

/// Splits on `separator` unless it is preceded by a backslash escape.
///
/// Escapes are kept in the returned segments.
#[must_use]
pub fn split_unescaped(raw: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            current.push(c);
            if let Some(escaped) = chars.next() {
                current.push(escaped);
            }
        } else if c == separator {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);

    parts
}
