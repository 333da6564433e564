//! Recursive-descent grouping of content lines into a component tree.

use super::error::{ParseError, ParseErrorKind, ParseResult};
use super::lexer::{parse_content_line, split_lines};
use crate::rfc::ical::core::{Component, ComponentKind, ContentLine, canonical_name};

type Lines = [(usize, ContentLine)];

/// Parses calendar text into its VCALENDAR component tree.
///
/// ## Errors
///
/// Returns an error if a content line is malformed, if BEGIN/END lines do
/// not nest, or if the text holds no VCALENDAR.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse(input: &str) -> ParseResult<Component> {
    tracing::debug!("Parsing calendar text");

    let lines = split_lines(input);
    if lines.is_empty() {
        tracing::warn!("Empty calendar input");
        return Err(ParseError::new(ParseErrorKind::EmptyInput, 1, 1));
    }

    let content_lines: Vec<(usize, ContentLine)> = lines
        .into_iter()
        .map(|(line_num, line)| parse_content_line(&line, line_num).map(|cl| (line_num, cl)))
        .collect::<ParseResult<_>>()?;

    tracing::trace!(count = content_lines.len(), "Parsed content lines");

    let mut roots = Vec::new();
    let mut pos = 0;
    while let Some((line_num, line)) = content_lines.get(pos) {
        match line.name.as_str() {
            "BEGIN" => {
                let (component, next) = parse_component(&content_lines, pos)?;
                roots.push(component);
                pos = next;
            }
            "END" => {
                return Err(
                    ParseError::new(ParseErrorKind::MissingBegin, *line_num, 1).with_context(
                        format!(
                            "END:{} without matching BEGIN",
                            line.raw_value.trim().to_ascii_uppercase()
                        ),
                    ),
                );
            }
            _ => {
                tracing::warn!(line = line_num, name = %line.name, "Ignoring property outside of any component");
                pos += 1;
            }
        }
    }

    if roots.len() > 1 {
        tracing::warn!(count = roots.len(), "Multiple top-level components, using the first VCALENDAR");
    }

    let root = roots
        .into_iter()
        .find(|c| c.kind == ComponentKind::Calendar)
        .ok_or_else(|| {
            ParseError::new(ParseErrorKind::UnexpectedRoot, 1, 1).with_context("expected VCALENDAR")
        })?;

    tracing::debug!(
        children = root.children.len(),
        properties = root.properties.len(),
        "Calendar text parsed"
    );

    Ok(root)
}

/// Parses the component opened by the BEGIN line at `begin`.
///
/// Returns the component and the position just past its END line.
fn parse_component(lines: &Lines, begin: usize) -> ParseResult<(Component, usize)> {
    let Some((begin_line, begin_cl)) = lines.get(begin) else {
        return Err(ParseError::new(ParseErrorKind::MissingBegin, 1, 1));
    };

    let type_name = begin_cl.raw_value.trim().to_ascii_uppercase();
    if type_name.is_empty() {
        return Err(ParseError::new(ParseErrorKind::MissingBegin, *begin_line, 7)
            .with_context("BEGIN without a component type"));
    }

    let mut component = Component::new(canonical_name(&type_name), *begin_line);
    let mut pos = begin + 1;

    while let Some((line_num, line)) = lines.get(pos) {
        match line.name.as_str() {
            "BEGIN" => {
                let (child, next) = parse_component(lines, pos)?;
                component.children.push(child);
                pos = next;
            }
            "END" => {
                let end_name = line.raw_value.trim().to_ascii_uppercase();
                if end_name != type_name {
                    return Err(
                        ParseError::new(ParseErrorKind::MismatchedComponent, *line_num, 1)
                            .with_context(format!("expected END:{type_name}, got END:{end_name}")),
                    );
                }
                tracing::trace!(component = %type_name, begin = begin_line, end = line_num, "Closed component");
                return Ok((component, pos + 1));
            }
            _ => {
                component.properties.push(line.clone().into_property());
                pos += 1;
            }
        }
    }

    Err(
        ParseError::new(ParseErrorKind::MissingEnd, *begin_line, 1)
            .with_context(format!("missing END:{type_name}")),
    )
}
