// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Day-granularity calendar events.

use chrono::NaiveDate;

use crate::error::ParseError;

use super::ical::{self, PropertyBag};

/// A calendar event reduced to the day it starts on.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use lampy::schedule::CalendarEvent;
///
/// let event = CalendarEvent::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
///     .with_summary("Black Bin Collection");
/// assert_eq!(event.summary(), Some("Black Bin Collection"));
/// assert_eq!(event.description(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    start: NaiveDate,
    summary: Option<String>,
    description: Option<String>,
}

impl CalendarEvent {
    /// Creates an event without summary or description.
    #[must_use]
    pub fn new(start: NaiveDate) -> Self {
        Self {
            start,
            summary: None,
            description: None,
        }
    }

    /// Sets the summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the start day.
    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Returns the summary, if the feed had one.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Returns the description, if the feed had one.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Builds an event from a feed entry.
    ///
    /// Returns `Ok(None)` for entries without `DTSTART`. Property order does
    /// not matter.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidValue`] if `DTSTART` does not start with
    /// a `YYYYMMDD` date.
    pub fn from_properties(bag: &PropertyBag) -> Result<Option<Self>, ParseError> {
        let mut start = None;
        let mut summary = None;
        let mut description = None;

        for property in bag {
            match property.name.as_str() {
                "DTSTART" => start = Some(parse_start(&property.value)?),
                "SUMMARY" => summary = Some(ical::unescape_text(&property.value)),
                "DESCRIPTION" => description = Some(ical::unescape_text(&property.value)),
                _ => {}
            }
        }

        Ok(start.map(|start| Self {
            start,
            summary,
            description,
        }))
    }
}

/// Parses the calendar date of a `DTSTART` value.
///
/// Date-time values (`20240115T093000Z`) contribute their date part.
fn parse_start(value: &str) -> Result<NaiveDate, ParseError> {
    let value = value.trim();
    let date = value.split_once('T').map_or(value, |(date, _)| date);
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidValue {
            field: "DTSTART".into(),
            message: format!("expected YYYYMMDD, got {value:?}"),
        });
    }
    NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|e| ParseError::InvalidValue {
        field: "DTSTART".into(),
        message: format!("{value:?}: {e}"),
    })
}

/// Parses every dated event out of a calendar document.
///
/// # Errors
///
/// Returns [`ParseError`] if the document or any `DTSTART` is malformed.
pub fn parse_calendar(document: &str) -> Result<Vec<CalendarEvent>, ParseError> {
    let mut events = Vec::new();
    for bag in ical::parse_events(document)? {
        if let Some(event) = CalendarEvent::from_properties(&bag)? {
            events.push(event);
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ical::Property;

    fn prop(name: &str, value: &str) -> Property {
        Property {
            name: name.into(),
            value: value.into(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn summary_before_start_is_kept() {
        let bag = vec![
            prop("SUMMARY", "Black Bin Collection"),
            prop("DESCRIPTION", "Cardboard\\, paper"),
            prop("DTSTART", "20240115"),
        ];
        let event = CalendarEvent::from_properties(&bag).unwrap().unwrap();
        assert_eq!(event.start(), date(2024, 1, 15));
        assert_eq!(event.summary(), Some("Black Bin Collection"));
        assert_eq!(event.description(), Some("Cardboard, paper"));
    }

    #[test]
    fn entry_without_start_is_dropped() {
        let bag = vec![prop("SUMMARY", "Floating")];
        assert_eq!(CalendarEvent::from_properties(&bag).unwrap(), None);
    }

    #[test]
    fn date_time_start_uses_date_part() {
        assert_eq!(parse_start("20240115T093000Z").unwrap(), date(2024, 1, 15));
    }

    #[test]
    fn malformed_start_is_an_error() {
        assert!(parse_start("2024-01-15").is_err());
        assert!(parse_start("20241332").is_err());
        assert!(parse_start("").is_err());
    }

    #[test]
    fn parse_calendar_skips_undated_entries() {
        let feed = "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\nSUMMARY:No date\nEND:VEVENT\n\
BEGIN:VEVENT\nDTSTART;VALUE=DATE:20240122\nSUMMARY:General Waste\nEND:VEVENT\n\
END:VCALENDAR\n";
        let events = parse_calendar(feed).unwrap();
        assert_eq!(
            events,
            vec![CalendarEvent::new(date(2024, 1, 22)).with_summary("General Waste")]
        );
    }
}
