// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by the bridge session, the decision policy and the
//! color mapper.
//!
//! # Types
//!
//! - [`Brightness`] - Brightness percentage (0-100%)
//! - [`RgbColor`] - Perceptual color with normalized channels
//! - [`XyColor`] - Chromaticity pair understood by the bridge
//! - [`LightId`] - Light resource identifier

mod brightness;
mod light_id;
mod rgb_color;
mod xy_color;

pub use brightness::Brightness;
pub use light_id::LightId;
pub use rgb_color::RgbColor;
pub use xy_color::XyColor;
