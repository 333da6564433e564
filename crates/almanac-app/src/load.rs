//! Reading calendar files and flattening them into host records.

use std::path::{Path, PathBuf};

use almanac_rfc::rfc::ical::{CalendarDocument, ExpansionOptions, NormalizedEvent, ParseOptions};
use chrono::{DateTime, Utc};

use crate::error::{AppError, AppResult};

/// ## Summary
/// Reads and parses one calendar file. Parsing runs on the blocking pool so
/// several files can be handled at once.
///
/// ## Errors
/// Returns [`AppError::IoError`] if the file cannot be read, or the parse
/// error of the document.
#[tracing::instrument(skip(path, options), fields(path = %path.display()))]
pub async fn load_calendar(path: &Path, options: ParseOptions) -> AppResult<CalendarDocument> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AppError::IoError {
            path: path.to_path_buf(),
            source,
        })?;

    let document = tokio::task::spawn_blocking(move || {
        CalendarDocument::parse_with_options(&text, &options)
    })
    .await??;

    tracing::debug!(events = document.events.len(), "Loaded calendar");
    Ok(document)
}

/// ## Summary
/// Loads every file concurrently. Each document is independent; one failing
/// file does not affect the others.
pub async fn load_all(
    paths: &[PathBuf],
    options: ParseOptions,
) -> Vec<(PathBuf, AppResult<CalendarDocument>)> {
    let loads = paths.iter().map(|path| async move {
        (path.clone(), load_calendar(path, options).await)
    });
    futures::future::join_all(loads).await
}

/// ## Summary
/// Normalized records of all documents for `[from, until)`, ordered by the
/// UTC instant of their start across documents. Events that cannot be
/// expanded are logged and skipped by each document.
///
/// ## Errors
/// Returns the window error if `until <= from`.
pub fn collect_records(
    documents: &[CalendarDocument],
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    options: &ExpansionOptions,
) -> AppResult<Vec<NormalizedEvent>> {
    let mut records = Vec::new();
    for document in documents {
        records.extend(document.timed_records_between(from, until, options)?);
    }
    records.sort_by_key(|timed| timed.instant);
    Ok(records.into_iter().map(|timed| timed.record).collect())
}
