//! Generic component tree produced by the line-structure parser.

use super::property::PropertyValue;

/// Component kinds the typed layer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Calendar,
    Event,
    Timezone,
    Standard,
    Daylight,
    /// Any other component (VALARM, VTODO, X-components, ...).
    Unknown,
}

impl ComponentKind {
    /// Returns the canonical key for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calendar => "vcalendar",
            Self::Event => "vevent",
            Self::Timezone => "vtimezone",
            Self::Standard => "standard",
            Self::Daylight => "daylight",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a component kind from a name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "vcalendar" => Self::Calendar,
            "vevent" => Self::Event,
            "vtimezone" => Self::Timezone,
            "standard" => Self::Standard,
            "daylight" => Self::Daylight,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A BEGIN/END block with its properties and nested blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub kind: ComponentKind,
    /// Canonical key of the component type (e.g. `vevent`, `valarm`).
    pub name: String,
    /// Line of the BEGIN that opened this component.
    pub line: usize,
    /// Properties in order of appearance.
    pub properties: Vec<PropertyValue>,
    pub children: Vec<Component>,
}

impl Component {
    #[must_use]
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        let name = name.into();
        Self {
            kind: ComponentKind::parse(&name),
            name,
            line,
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns the first property with the given canonical key.
    #[must_use]
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.iter().find(|p| p.name == key)
    }

    /// Returns all properties with the given canonical key.
    #[must_use]
    pub fn get_properties(&self, key: &str) -> Vec<&PropertyValue> {
        self.properties.iter().filter(|p| p.name == key).collect()
    }

    /// Returns the children of the given kind in document order.
    pub fn children_of(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// Returns the first child of the given kind.
    #[must_use]
    pub fn first_child(&self, kind: ComponentKind) -> Option<&Component> {
        self.children_of(kind).next()
    }

    /// Upper-case iCalendar name for messages (`VEVENT`).
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name.to_ascii_uppercase()
    }
}
