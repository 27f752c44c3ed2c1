// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lampy - a Hue light that tells you which bin goes out.
//!
//! The library finds a Philips Hue bridge on the local network, pairs with
//! it through the link button, and drives one light from a collection
//! calendar published as an iCal feed.
//!
//! # Components
//!
//! - [`bridge`]: discovery, the link-button handshake and light control
//! - [`schedule`]: cached calendar feed with a look-ahead window
//! - [`policy`]: brightness and category for the next collection
//! - [`color`]: RGB to CIE xy conversion
//! - [`daemon`]: the periodic loop combining the above
//!
//! # Quick Start
//!
//! ```no_run
//! use lampy::bridge::{AuthOptions, Bridge, BridgeConfig, BridgeEndpoint};
//! use lampy::daemon::{DaemonOptions, Lampy};
//! use lampy::schedule::{HttpCalendar, Schedule, ScheduleOptions};
//!
//! #[tokio::main]
//! async fn main() -> lampy::Result<()> {
//!     let endpoint = BridgeEndpoint::from_address("192.168.1.2".parse().unwrap());
//!     let bridge = Bridge::with_config(endpoint, &BridgeConfig::default())?;
//!
//!     // Press the link button on the bridge while this runs.
//!     bridge.authenticate(&AuthOptions::new("lampy", "v1.0")).await?;
//!
//!     let schedule = Schedule::new(
//!         HttpCalendar::new("https://council.example/bins.ics")?,
//!         ScheduleOptions::default(),
//!     );
//!     let lampy = Lampy::start(bridge, schedule, DaemonOptions::default()).await?;
//!     lampy.run(async { tokio::signal::ctrl_c().await.unwrap_or(()) }).await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod color;
pub mod daemon;
pub mod error;
pub mod policy;
pub mod schedule;
pub mod types;

pub use bridge::{AuthOptions, AuthState, Bridge, BridgeConfig, BridgeEndpoint, Credentials};
pub use daemon::{DaemonOptions, Lampy};
pub use error::{Error, ParseError, ProtocolError, Result, ValueError};
pub use policy::{Category, ColorTable, DecisionPolicy, LightDecision};
pub use schedule::{CalendarEvent, HttpCalendar, Schedule, ScheduleOptions};
pub use types::{Brightness, LightId, RgbColor, XyColor};
