// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CIE 1931 chromaticity pair, the bridge's native color coordinate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A chromaticity coordinate `(x, y)`.
///
/// Values are passed to the bridge unmodified; no clamping against a
/// light's color gamut is done.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XyColor {
    /// x coordinate.
    pub x: f64,
    /// y coordinate.
    pub y: f64,
}

impl XyColor {
    /// Creates a new chromaticity pair.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for XyColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}
