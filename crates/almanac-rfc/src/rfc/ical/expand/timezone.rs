//! TZID lookup for a single document.

use std::collections::HashMap;
use std::sync::Arc;

use super::vtimezone::TimezoneDefinition;
use crate::error::RfcResult;
use crate::rfc::ical::core::{Component, ComponentKind};

/// Time zones of one document, keyed by TZID.
///
/// Built once per parse and handed to every event constructor; events hold
/// shared references into it.
#[derive(Debug, Clone, Default)]
pub struct TimezoneTable {
    ordered: Vec<Arc<TimezoneDefinition>>,
    by_tzid: HashMap<String, Arc<TimezoneDefinition>>,
}

/// ## Summary
/// Builds a `TimezoneTable` from every VTIMEZONE child of `root`.
///
/// ## Errors
/// Returns an error if any VTIMEZONE is invalid.
pub fn build_timezone_table(root: &Component) -> RfcResult<TimezoneTable> {
    let mut table = TimezoneTable::new();

    for component in root.children_of(ComponentKind::Timezone) {
        table.register(TimezoneDefinition::from_component(component)?);
    }

    Ok(table)
}

impl TimezoneTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Registers a definition. The first definition of a TZID wins; later
    /// duplicates are ignored with a warning.
    pub fn register(&mut self, definition: TimezoneDefinition) -> Arc<TimezoneDefinition> {
        if let Some(existing) = self.by_tzid.get(&definition.tzid) {
            tracing::warn!(tzid = %definition.tzid, "Ignoring duplicate VTIMEZONE");
            return Arc::clone(existing);
        }

        let definition = Arc::new(definition);
        self.by_tzid
            .insert(definition.tzid.clone(), Arc::clone(&definition));
        self.ordered.push(Arc::clone(&definition));
        definition
    }

    #[must_use]
    pub fn get(&self, tzid: &str) -> Option<&Arc<TimezoneDefinition>> {
        self.by_tzid.get(tzid)
    }

    /// ## Summary
    /// Resolves a TZID parameter.
    ///
    /// An unknown TZID falls back to floating time (`None`) with a warning.
    #[must_use]
    pub fn resolve(&self, tzid: Option<&str>) -> Option<Arc<TimezoneDefinition>> {
        let tzid = tzid?;
        let found = self.get(tzid).cloned();
        if found.is_none() {
            tracing::warn!(%tzid, "Unknown TZID, treating value as floating time");
        }
        found
    }

    /// Definitions in document order.
    #[must_use]
    pub fn definitions(&self) -> &[Arc<TimezoneDefinition>] {
        &self.ordered
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
