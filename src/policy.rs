// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mapping from the next collection to a light state.
//!
//! The light gets brighter as collection day approaches and dims in the
//! afternoon of the day itself. Its color tells which bin goes out.

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDateTime, TimeDelta, Timelike};

use crate::schedule::CalendarEvent;
use crate::types::{Brightness, RgbColor};

/// Which kind of collection an event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Cardboard and paper (the black bin).
    Recycling,
    /// Everything else.
    Garbage,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recycling => write!(f, "recycling"),
            Self::Garbage => write!(f, "garbage"),
        }
    }
}

/// Desired light state for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightDecision {
    /// Target brightness.
    pub brightness: Brightness,
    /// Collection kind, used to look up the color.
    pub category: Category,
}

/// Brightness while collection day is at least a day away.
const BRIGHTNESS_SOON: Brightness = Brightness::clamped(100);
/// Brightness on the afternoon of collection day.
const BRIGHTNESS_AFTERNOON: Brightness = Brightness::clamped(10);
/// Brightness two days before.
const BRIGHTNESS_APPROACHING: Brightness = Brightness::clamped(20);
/// Hours after which collection day counts as afternoon.
const NOON: u32 = 12;

/// Classifies events and derives light decisions.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use lampy::policy::{Category, DecisionPolicy};
/// use lampy::schedule::CalendarEvent;
///
/// let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
/// let event = CalendarEvent::new(day).with_summary("Black Bin Collection");
///
/// let decision = DecisionPolicy::default().decide(day.and_hms_opt(9, 0, 0).unwrap(), &event);
/// assert_eq!(decision.brightness.value(), 100);
/// assert_eq!(decision.category, Category::Recycling);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionPolicy {
    marker: String,
}

impl DecisionPolicy {
    /// Summary substring that marks a recycling collection.
    pub const DEFAULT_MARKER: &'static str = "black bin";

    /// Creates a policy matching `marker` case-insensitively.
    #[must_use]
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().to_lowercase(),
        }
    }

    /// Returns the lowercase marker.
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Classifies an event by its summary.
    #[must_use]
    pub fn classify(&self, event: &CalendarEvent) -> Category {
        match event.summary() {
            Some(summary) if summary.to_lowercase().contains(&self.marker) => Category::Recycling,
            _ => Category::Garbage,
        }
    }

    /// Decides the light state for `event` as seen at local time `now`.
    #[must_use]
    pub fn decide(&self, now: NaiveDateTime, event: &CalendarEvent) -> LightDecision {
        LightDecision {
            brightness: brightness_for(now, event),
            category: self.classify(event),
        }
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MARKER)
    }
}

/// Decides with the default policy.
#[must_use]
pub fn decide(now: NaiveDateTime, event: &CalendarEvent) -> LightDecision {
    DecisionPolicy::default().decide(now, event)
}

fn brightness_for(now: NaiveDateTime, event: &CalendarEvent) -> Brightness {
    let diff = event.start().signed_duration_since(now.date());

    // Tomorrow shares the bucket with today, but only today dims after noon.
    if diff == TimeDelta::zero() || diff == TimeDelta::hours(24) {
        if diff == TimeDelta::zero() && now.hour() > NOON {
            BRIGHTNESS_AFTERNOON
        } else {
            BRIGHTNESS_SOON
        }
    } else if diff == TimeDelta::hours(48) {
        BRIGHTNESS_APPROACHING
    } else {
        Brightness::MIN
    }
}

/// Colors to show per category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorTable {
    colors: HashMap<Category, RgbColor>,
}

impl ColorTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the color of a category.
    #[must_use]
    pub fn with(mut self, category: Category, color: RgbColor) -> Self {
        self.insert(category, color);
        self
    }

    /// Adds or replaces the color of a category.
    pub fn insert(&mut self, category: Category, color: RgbColor) -> Option<RgbColor> {
        self.colors.insert(category, color)
    }

    /// Returns the color of a category, if one is configured.
    #[must_use]
    pub fn get(&self, category: Category) -> Option<RgbColor> {
        self.colors.get(&category).copied()
    }
}
