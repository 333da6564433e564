use std::path::PathBuf;

pub use almanac_core::config::*;
use almanac_rfc::rfc::ical::{ExpansionOptions, ParseOptions};

/// Document construction options taken from the `expansion` section.
#[must_use]
pub const fn parse_options(settings: &Settings) -> ParseOptions {
    ParseOptions {
        default_end: settings.expansion.timed_default_end,
    }
}

#[must_use]
pub const fn expansion_options(settings: &Settings) -> ExpansionOptions {
    ExpansionOptions {
        max_instances: settings.expansion.max_instances,
        lookahead_days: settings.expansion.lookahead_days,
    }
}

/// ## Summary
/// Calendar files to read: command line arguments when any are given,
/// otherwise `source.paths` from the configuration.
#[must_use]
pub fn source_paths(settings: &Settings, args: Vec<String>) -> Vec<PathBuf> {
    let paths = if args.is_empty() {
        settings.source.paths.clone()
    } else {
        args
    };
    paths.into_iter().map(PathBuf::from).collect()
}
