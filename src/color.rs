// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion from perceptual RGB to the bridge's chromaticity pair.
//!
//! Follows the Hue "RGB to xy" recipe: gamma-expand every sRGB channel,
//! project through the wide-gamut D65 matrix and normalize `X` and `Y` by
//! `X + Y + Z`. The result is not clamped to the light's gamut triangle; the
//! bridge maps out-of-gamut points to the closest reproducible color.

use crate::error::ValueError;
use crate::types::{RgbColor, XyColor};

/// Raw channel values above this use the gamma curve, the rest are linear.
pub const GAMMA_THRESHOLD: f64 = 0.040_45;

/// Converts an RGB color into an `(x, y)` chromaticity pair.
///
/// # Errors
///
/// Returns [`ValueError::Achromatic`] when `X + Y + Z` is zero (pure black)
/// or not a finite number, since no chromaticity exists for such a color.
///
/// # Examples
///
/// ```
/// use lampy::color::rgb_to_xy;
/// use lampy::types::RgbColor;
///
/// let xy = rgb_to_xy(&RgbColor::new(0.0, 1.0, 0.0)).unwrap();
/// assert!((xy.x - 0.3).abs() < 1e-9);
/// assert!((xy.y - 0.6).abs() < 1e-9);
///
/// assert!(rgb_to_xy(&RgbColor::new(0.0, 0.0, 0.0)).is_err());
/// ```
pub fn rgb_to_xy(color: &RgbColor) -> Result<XyColor, ValueError> {
    let clamped = color.clamped();
    let red = expand(color.red(), clamped.red());
    let green = expand(color.green(), clamped.green());
    let blue = expand(color.blue(), clamped.blue());

    let x = red * 0.4124 + green * 0.3576 + blue * 0.1805;
    let y = red * 0.2126 + green * 0.7152 + blue * 0.0722;
    let z = red * 0.0193 + green * 0.1192 + blue * 0.9505;

    let sum = x + y + z;
    if sum.abs() < f64::EPSILON || !sum.is_finite() {
        return Err(ValueError::Achromatic(color.to_hex()));
    }

    Ok(XyColor::new(x / sum, y / sum))
}

/// Linearizes one sRGB channel.
///
/// The threshold is tested on the raw value; only the gamma branch uses the
/// clamped value.
fn expand(raw: f64, clamped: f64) -> f64 {
    if raw > GAMMA_THRESHOLD {
        ((clamped + 0.055) / 1.055).powf(2.4)
    } else {
        raw / 12.92
    }
}
