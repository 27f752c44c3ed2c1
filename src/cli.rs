// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command line and environment configuration of the daemon.

use std::net::IpAddr;
use std::time::Duration;

use chrono::TimeDelta;
use clap::Parser;

use lampy::bridge::discovery::DiscoveryOptions;
use lampy::{Category, ColorTable, DaemonOptions, RgbColor};

/// Drives a Hue light from a bin collection calendar.
///
/// Pre-provisioned credentials are read from `HUE_USERNAME` and
/// `HUE_CLIENT_KEY`; without them the bridge's link button must be pressed
/// on first start.
#[derive(Parser, Debug)]
#[command(name = "lampy", version, about)]
pub struct Cli {
    /// iCal URL of the collection calendar
    #[arg(long, env = "LAMPY_SCHEDULE")]
    pub schedule: String,

    /// Bridge address to use when discovery finds nothing
    #[arg(long, env = "HUE_BRIDGE")]
    pub bridge: Option<IpAddr>,

    /// How long to look for a bridge on the network (seconds)
    #[arg(long, default_value_t = 5)]
    pub discovery_timeout: u64,

    /// Name of the light to drive
    #[arg(long, env = "LAMPY_LIGHT", default_value = DaemonOptions::DEFAULT_LIGHT_NAME)]
    pub light: String,

    /// Color for recycling (black bin) days
    #[arg(long, default_value = "#04db50")]
    pub recycling_color: RgbColor,

    /// Color for garbage days
    #[arg(long, default_value = "#0761f2")]
    pub garbage_color: RgbColor,

    /// Time between schedule checks (seconds)
    #[arg(long, default_value_t = 4 * 60 * 60)]
    pub cycle: u64,

    /// How many days ahead to look for collections
    #[arg(long, default_value_t = 7)]
    pub window_days: u32,

    /// Application name announced to the bridge
    #[arg(long, default_value = "lampy")]
    pub app_name: String,

    /// Instance label announced to the bridge
    #[arg(long, default_value = "v1.0")]
    pub instance: String,
}

impl Cli {
    /// Discovery settings.
    #[cfg_attr(not(feature = "mdns"), allow(dead_code))]
    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions::new().with_timeout(Duration::from_secs(self.discovery_timeout))
    }

    /// Loop settings.
    pub fn daemon_options(&self) -> DaemonOptions {
        DaemonOptions::new()
            .with_cycle(Duration::from_secs(self.cycle))
            .with_window(TimeDelta::days(i64::from(self.window_days)))
            .with_light_name(&self.light)
            .with_colors(
                ColorTable::new()
                    .with(Category::Recycling, self.recycling_color)
                    .with(Category::Garbage, self.garbage_color),
            )
    }
}
