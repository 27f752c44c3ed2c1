// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Collection schedule backed by a remote calendar feed.
//!
//! [`Schedule`] keeps the last successfully parsed feed in memory and only
//! goes back to the network once that copy is older than the freshness
//! window. A failed refresh leaves the previous copy in place.
//!
//! # Examples
//!
//! ```no_run
//! use chrono::TimeDelta;
//! use lampy::schedule::{HttpCalendar, Schedule, ScheduleOptions};
//!
//! # async fn example() -> lampy::Result<()> {
//! let source = HttpCalendar::new("https://council.example/bins.ics")?;
//! let schedule = Schedule::new(source, ScheduleOptions::default());
//!
//! for event in schedule.upcoming(TimeDelta::days(7)).await? {
//!     println!("{} {:?}", event.start(), event.summary());
//! }
//! # Ok(())
//! # }
//! ```

mod clock;
mod event;
pub mod ical;
mod source;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use parking_lot::RwLock;

use crate::error::Result;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{CalendarEvent, parse_calendar};
pub use source::{CalendarSource, HttpCalendar};

/// Cache behavior of a [`Schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleOptions {
    freshness: TimeDelta,
}

impl ScheduleOptions {
    /// Default freshness window (72 hours).
    pub const DEFAULT_FRESHNESS: TimeDelta = TimeDelta::hours(72);

    /// Creates options with the default freshness window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            freshness: Self::DEFAULT_FRESHNESS,
        }
    }

    /// Sets how long a fetched feed is served before it is fetched again.
    #[must_use]
    pub fn with_freshness(mut self, freshness: TimeDelta) -> Self {
        self.freshness = freshness;
        self
    }

    /// Returns the freshness window.
    #[must_use]
    pub fn freshness(&self) -> TimeDelta {
        self.freshness
    }
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// One successfully parsed feed.
#[derive(Debug)]
struct Snapshot {
    events: Arc<[CalendarEvent]>,
    fetched_at: DateTime<Utc>,
}

/// Cached view of a calendar feed.
pub struct Schedule<S, C = SystemClock> {
    source: S,
    clock: C,
    options: ScheduleOptions,
    cache: RwLock<Option<Snapshot>>,
    // Single-flight guard: at most one refresh in progress.
    refresh: tokio::sync::Mutex<()>,
}

impl<S: CalendarSource> Schedule<S> {
    /// Creates a schedule reading the system clock.
    #[must_use]
    pub fn new(source: S, options: ScheduleOptions) -> Self {
        Self::with_clock(source, SystemClock, options)
    }
}

impl<S: CalendarSource, C: Clock> Schedule<S, C> {
    /// Creates a schedule reading time from `clock`.
    #[must_use]
    pub fn with_clock(source: S, clock: C, options: ScheduleOptions) -> Self {
        Self {
            source,
            clock,
            options,
            cache: RwLock::new(None),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns the clock this schedule reads.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Returns the cache options.
    #[must_use]
    pub fn options(&self) -> ScheduleOptions {
        self.options
    }

    /// Returns when the cached feed was fetched, if it ever was.
    #[must_use]
    pub fn last_fetch(&self) -> Option<DateTime<Utc>> {
        self.cache.read().as_ref().map(|snapshot| snapshot.fetched_at)
    }

    /// Returns every event of the feed, in feed order.
    ///
    /// Served from memory while the last fetch is younger than the
    /// freshness window; otherwise the feed is downloaded and parsed first.
    ///
    /// # Errors
    ///
    /// Returns the fetch or parse error of a refresh. The cached copy is
    /// kept and the next call retries.
    pub async fn events(&self) -> Result<Arc<[CalendarEvent]>> {
        if let Some(events) = self.fresh() {
            return Ok(events);
        }

        let _guard = self.refresh.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(events) = self.fresh() {
            return Ok(events);
        }

        let document = self.source.fetch().await.inspect_err(|e| {
            tracing::warn!(phase = "fetch", error = %e, "Failed to download calendar");
        })?;
        let events: Arc<[CalendarEvent]> = parse_calendar(&document)
            .inspect_err(|e| {
                tracing::warn!(phase = "fetch", error = %e, "Failed to parse calendar");
            })?
            .into();
        let fetched_at = self.clock.now();

        tracing::info!(events = events.len(), fetched_at = %fetched_at, "Calendar refreshed");

        *self.cache.write() = Some(Snapshot {
            events: Arc::clone(&events),
            fetched_at,
        });
        Ok(events)
    }

    /// Returns the events from today up to, but excluding, `today + window`.
    ///
    /// An event dated today is always included. Feed order is kept.
    ///
    /// # Errors
    ///
    /// Same as [`events`](Self::events).
    pub async fn upcoming(&self, window: TimeDelta) -> Result<Vec<CalendarEvent>> {
        let events = self.events().await?;
        let today = self.clock.today();
        Ok(events
            .iter()
            .filter(|event| in_window(event.start(), today, window))
            .cloned()
            .collect())
    }

    fn fresh(&self) -> Option<Arc<[CalendarEvent]>> {
        let cache = self.cache.read();
        let snapshot = cache.as_ref()?;
        // A window past the end of time never expires.
        let fresh = snapshot
            .fetched_at
            .checked_add_signed(self.options.freshness)
            .is_none_or(|expires| self.clock.now() < expires);
        fresh.then(|| Arc::clone(&snapshot.events))
    }
}

impl<S, C> std::fmt::Debug for Schedule<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schedule")
            .field("options", &self.options)
            .field(
                "last_fetch",
                &self.cache.read().as_ref().map(|s| s.fetched_at),
            )
            .finish_non_exhaustive()
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

fn in_window(start: NaiveDate, today: NaiveDate, window: TimeDelta) -> bool {
    if start == today {
        return true;
    }
    let Some(edge) = midnight(today).checked_add_signed(window) else {
        return start > today;
    };
    start > today && midnight(start) < edge
}
