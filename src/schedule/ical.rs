// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Minimal iCalendar (RFC 5545) reader.
//!
//! Splits a calendar document into one property bag per `VEVENT`. Property
//! parameters are dropped and values are kept raw; interpreting them is up
//! to [`CalendarEvent`](super::CalendarEvent). Components nested inside an
//! event (alarms) are skipped.

use crate::error::ParseError;

/// One `NAME:value` line of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Upper-cased property name.
    pub name: String,
    /// Raw value, still escaped.
    pub value: String,
}

/// All properties of one event, in feed order.
pub type PropertyBag = Vec<Property>;

/// Parses a calendar document into event property bags.
///
/// # Errors
///
/// Returns [`ParseError`] if the document is not a `VCALENDAR`, a content
/// line has no value separator, or `BEGIN`/`END` lines do not balance.
pub fn parse_events(document: &str) -> Result<Vec<PropertyBag>, ParseError> {
    let mut lines = unfold(document).into_iter();

    match lines.next() {
        Some(first) if first.eq_ignore_ascii_case("BEGIN:VCALENDAR") => {}
        _ => {
            return Err(ParseError::UnexpectedFormat(
                "document does not start with BEGIN:VCALENDAR".into(),
            ));
        }
    }

    let mut stack = vec!["VCALENDAR".to_string()];
    let mut events = Vec::new();
    let mut current: Option<PropertyBag> = None;

    for line in lines {
        let property = parse_line(&line)?;
        match property.name.as_str() {
            "BEGIN" => {
                let component = property.value.to_ascii_uppercase();
                if component == "VEVENT" && stack.len() == 1 {
                    current = Some(Vec::new());
                }
                stack.push(component);
            }
            "END" => {
                let component = property.value.to_ascii_uppercase();
                match stack.pop() {
                    Some(open) if open == component => {}
                    Some(open) => {
                        return Err(ParseError::UnexpectedFormat(format!(
                            "END:{component} closes BEGIN:{open}"
                        )));
                    }
                    None => {
                        return Err(ParseError::UnexpectedFormat(format!(
                            "END:{component} after end of calendar"
                        )));
                    }
                }
                if component == "VEVENT" && stack.len() == 1 {
                    events.extend(current.take());
                }
            }
            _ if stack.len() == 2 && stack[1] == "VEVENT" => {
                if let Some(bag) = current.as_mut() {
                    bag.push(property);
                }
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ParseError::UnexpectedFormat(format!(
            "unterminated component {}",
            stack.join("/")
        )));
    }

    Ok(events)
}

/// Undoes line folding: a line starting with a space or tab continues the
/// previous one. Blank lines are dropped.
fn unfold(document: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in document.trim_start_matches('\u{feff}').lines() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        match (raw.strip_prefix([' ', '\t']), lines.last_mut()) {
            (Some(continuation), Some(previous)) => previous.push_str(continuation),
            _ if raw.trim().is_empty() => {}
            _ => lines.push(raw.to_string()),
        }
    }
    lines
}

/// Splits a content line into name and value, ignoring parameters.
///
/// Parameter values may be quoted and contain `:` or `;`.
fn parse_line(line: &str) -> Result<Property, ParseError> {
    let mut in_quotes = false;
    let mut name_end = None;
    let mut value_start = None;

    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes && name_end.is_none() => name_end = Some(i),
            ':' if !in_quotes => {
                value_start = Some(i);
                break;
            }
            _ => {}
        }
    }

    let colon = value_start.ok_or_else(|| ParseError::InvalidValue {
        field: "content line".into(),
        message: format!("missing ':' in {line:?}"),
    })?;
    let name = line[..name_end.unwrap_or(colon)].trim();
    if name.is_empty() {
        return Err(ParseError::InvalidValue {
            field: "content line".into(),
            message: format!("missing property name in {line:?}"),
        });
    }

    Ok(Property {
        name: name.to_ascii_uppercase(),
        value: line[colon + 1..].to_string(),
    })
}

/// Decodes TEXT escapes (`\n`, `\,`, `\;`, `\\`).
#[must_use]
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
