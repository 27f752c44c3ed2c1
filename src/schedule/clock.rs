// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Time source for the schedule cache and the decision policy.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use parking_lot::Mutex;

/// A source of the current time.
///
/// `now` drives cache expiry; `wall_clock` is the local calendar time used
/// to decide which day it is and what hour of the day.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current local date and time of day.
    fn wall_clock(&self) -> NaiveDateTime;

    /// Current day; the wall clock truncated to midnight.
    fn today(&self) -> NaiveDate {
        self.wall_clock().date()
    }
}

/// The system clock, using the host's local time zone for the wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn wall_clock(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to. Wall clock and instant are the
/// same reading, taken as UTC.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, TimeDelta};
/// use lampy::schedule::{Clock, ManualClock};
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let clock = ManualClock::new(start);
/// clock.advance(TimeDelta::hours(20));
/// assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
/// ```
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<NaiveDateTime>,
}

impl ManualClock {
    /// Creates a clock stopped at `start`.
    #[must_use]
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Moves the clock to `time`.
    pub fn set(&self, time: NaiveDateTime) {
        *self.current.lock() = time;
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut current = self.current.lock();
        *current += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.current.lock().and_utc()
    }

    fn wall_clock(&self) -> NaiveDateTime {
        *self.current.lock()
    }
}
