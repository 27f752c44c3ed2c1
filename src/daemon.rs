// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The periodic loop tying schedule, policy and light together.

use std::future::Future;
use std::time::Duration;

use chrono::TimeDelta;
use tokio::time::MissedTickBehavior;

use crate::bridge::Bridge;
use crate::color;
use crate::error::Result;
use crate::policy::{Category, ColorTable, DecisionPolicy, LightDecision};
use crate::schedule::{CalendarSource, Clock, Schedule, SystemClock};
use crate::types::{Brightness, LightId, RgbColor};

/// Settings of the orchestration loop.
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    cycle: Duration,
    window: TimeDelta,
    light_name: String,
    policy: DecisionPolicy,
    colors: ColorTable,
}

impl DaemonOptions {
    /// Default time between cycles (4 hours).
    pub const DEFAULT_CYCLE: Duration = Duration::from_secs(4 * 60 * 60);

    /// Default look-ahead window (7 days).
    pub const DEFAULT_WINDOW: TimeDelta = TimeDelta::days(7);

    /// Default name of the light to drive.
    pub const DEFAULT_LIGHT_NAME: &'static str = "Lampy";

    /// Shortest accepted cycle.
    pub const MIN_CYCLE: Duration = Duration::from_secs(1);

    /// Creates options with defaults and the stock colors: green for
    /// recycling, blue for garbage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cycle: Self::DEFAULT_CYCLE,
            window: Self::DEFAULT_WINDOW,
            light_name: Self::DEFAULT_LIGHT_NAME.to_string(),
            policy: DecisionPolicy::default(),
            colors: ColorTable::new()
                .with(Category::Recycling, RgbColor::from_rgb8(0x04, 0xdb, 0x50))
                .with(Category::Garbage, RgbColor::from_rgb8(0x07, 0x61, 0xf2)),
        }
    }

    /// Sets the time between cycles. Values below [`MIN_CYCLE`](Self::MIN_CYCLE)
    /// are raised to it.
    #[must_use]
    pub fn with_cycle(mut self, cycle: Duration) -> Self {
        self.cycle = cycle.max(Self::MIN_CYCLE);
        self
    }

    /// Sets how far ahead events are considered.
    #[must_use]
    pub fn with_window(mut self, window: TimeDelta) -> Self {
        self.window = window;
        self
    }

    /// Sets the name of the light to drive.
    #[must_use]
    pub fn with_light_name(mut self, name: impl Into<String>) -> Self {
        self.light_name = name.into();
        self
    }

    /// Sets the decision policy.
    #[must_use]
    pub fn with_policy(mut self, policy: DecisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the color table.
    #[must_use]
    pub fn with_colors(mut self, colors: ColorTable) -> Self {
        self.colors = colors;
        self
    }

    /// Returns the time between cycles.
    #[must_use]
    pub fn cycle(&self) -> Duration {
        self.cycle
    }

    /// Returns the look-ahead window.
    #[must_use]
    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// Returns the light name.
    #[must_use]
    pub fn light_name(&self) -> &str {
        &self.light_name
    }

    /// Returns the decision policy.
    #[must_use]
    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    /// Returns the color table.
    #[must_use]
    pub fn colors(&self) -> &ColorTable {
        &self.colors
    }
}

impl Default for DaemonOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A running lamp: an authenticated bridge, the light it drives and the
/// schedule it follows.
pub struct Lampy<S, C = SystemClock> {
    bridge: Bridge,
    schedule: Schedule<S, C>,
    options: DaemonOptions,
    light: LightId,
}

impl<S: CalendarSource, C: Clock> Lampy<S, C> {
    /// Looks up the configured light and switches it to zero brightness.
    ///
    /// The bridge must already be authenticated. A rejected reset is logged
    /// and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LightNotFound`](crate::Error::LightNotFound) if no
    /// light has the configured name, or the bridge error of the lookup.
    pub async fn start(bridge: Bridge, schedule: Schedule<S, C>, options: DaemonOptions) -> Result<Self> {
        let light = bridge
            .light_by_name(options.light_name())
            .await
            .inspect_err(|e| {
                tracing::error!(phase = "apply", light = options.light_name(), error = %e, "Failed to find light");
            })?;
        tracing::info!(light = %light.id, name = %light.metadata.name, "Found light");

        // The first cycle sets brightness again, so a failed reset is not fatal.
        if let Err(e) = bridge.set_brightness(light.id, Brightness::MIN).await {
            tracing::warn!(phase = "apply", light = %light.id, error = %e, "Failed to reset brightness");
        }

        Ok(Self {
            bridge,
            schedule,
            options,
            light: light.id,
        })
    }

    /// Returns the bridge.
    #[must_use]
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Returns the schedule.
    #[must_use]
    pub fn schedule(&self) -> &Schedule<S, C> {
        &self.schedule
    }

    /// Returns the driven light.
    #[must_use]
    pub fn light(&self) -> LightId {
        self.light
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &DaemonOptions {
        &self.options
    }

    /// Runs one cycle: reads upcoming events, decides and applies the light
    /// state for the earliest.
    ///
    /// Returns `None` if nothing is coming up. A missing or achromatic
    /// color is logged and skipped, leaving brightness applied.
    ///
    /// # Errors
    ///
    /// Returns the schedule error if the feed cannot be read, or the bridge
    /// error if the light rejects an update.
    pub async fn run_cycle(&self) -> Result<Option<LightDecision>> {
        let mut events = self.schedule.upcoming(self.options.window).await?;
        events.sort_by_key(crate::schedule::CalendarEvent::start);

        let Some(next) = events.first() else {
            tracing::info!("No upcoming events");
            return Ok(None);
        };

        let now = self.schedule.clock().wall_clock();
        let decision = self.options.policy.decide(now, next);
        tracing::info!(
            phase = "decide",
            date = %next.start(),
            days_away = (next.start() - now.date()).num_days(),
            category = %decision.category,
            brightness = %decision.brightness,
            "Next collection"
        );

        self.apply(decision).await.inspect_err(|e| {
            tracing::warn!(phase = "apply", light = %self.light, error = %e, "Failed to update light");
        })?;
        Ok(Some(decision))
    }

    async fn apply(&self, decision: LightDecision) -> Result<()> {
        self.bridge.set_on(self.light, true).await?;
        self.bridge.set_brightness(self.light, decision.brightness).await?;

        let Some(rgb) = self.options.colors.get(decision.category) else {
            tracing::warn!(phase = "decide", category = %decision.category, "No color for category");
            return Ok(());
        };
        match color::rgb_to_xy(&rgb) {
            Ok(xy) => self.bridge.set_color(self.light, xy).await,
            Err(e) => {
                tracing::warn!(phase = "decide", category = %decision.category, error = %e, "Skipping color");
                Ok(())
            }
        }
    }

    /// Runs a cycle now and then once per cycle period until `shutdown`
    /// completes.
    ///
    /// Failed cycles are logged; the next one retries. Shutdown is honored
    /// while a cycle is running, dropping the cycle's pending requests.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(self.options.cycle.max(DaemonOptions::MIN_CYCLE));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(every = ?self.options.cycle, "Starting schedule loop");
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Shutting down");
                    break;
                }
                _ = ticker.tick() => {}
            }

            // Shutdown abandons a cycle in progress.
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Shutting down during cycle");
                    break;
                }
                result = self.run_cycle() => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "Cycle failed, retrying next period");
                    }
                }
            }
        }
    }
}

impl<S, C> std::fmt::Debug for Lampy<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lampy")
            .field("bridge", &self.bridge)
            .field("light", &self.light)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
