// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Perceptual RGB color with hex parsing.
//!
//! Channels are stored as normalized floats so that colors coming from
//! arithmetic (blending, scaling) can temporarily leave the `[0, 1]` range.
//! Use [`RgbColor::clamped`] to bring such a color back into range.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// sRGB color with normalized channels.
///
/// # Examples
///
/// ```
/// use lampy::types::RgbColor;
///
/// let green = RgbColor::from_hex("#04db50").unwrap();
/// assert_eq!(green.to_hex(), "#04DB50");
///
/// let red = RgbColor::new(1.0, 0.0, 0.0);
/// assert!((red.red() - 1.0).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColor {
    red: f64,
    green: f64,
    blue: f64,
}

impl RgbColor {
    /// Creates a color from normalized channels.
    ///
    /// Values outside `[0, 1]` are kept as given.
    #[must_use]
    pub const fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }

    /// Creates a color from 8-bit channels.
    #[must_use]
    pub fn from_rgb8(red: u8, green: u8, blue: u8) -> Self {
        Self::new(
            f64::from(red) / 255.0,
            f64::from(green) / 255.0,
            f64::from(blue) / 255.0,
        )
    }

    /// Parses a color from a hex string.
    ///
    /// Accepts formats: `#RRGGBB`, `RRGGBB`, `#RGB`, `RGB`
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidHexColor` if the string is not a hex color.
    pub fn from_hex(hex: &str) -> Result<Self, ValueError> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || ValueError::InvalidHexColor(hex.to_string());

        if !digits.is_ascii() {
            return Err(invalid());
        }

        match digits.len() {
            3 => {
                let mut channels = [0u8; 3];
                for (slot, c) in channels.iter_mut().zip(digits.chars()) {
                    let nibble = c.to_digit(16).ok_or_else(invalid)?;
                    // 0xF -> 0xFF
                    *slot = u8::try_from(nibble * 17).map_err(|_| invalid())?;
                }
                Ok(Self::from_rgb8(channels[0], channels[1], channels[2]))
            }
            6 => {
                let pair = |range: std::ops::Range<usize>| {
                    u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
                };
                Ok(Self::from_rgb8(pair(0..2)?, pair(2..4)?, pair(4..6)?))
            }
            _ => Err(invalid()),
        }
    }

    /// Returns the red channel.
    #[must_use]
    pub const fn red(&self) -> f64 {
        self.red
    }

    /// Returns the green channel.
    #[must_use]
    pub const fn green(&self) -> f64 {
        self.green
    }

    /// Returns the blue channel.
    #[must_use]
    pub const fn blue(&self) -> f64 {
        self.blue
    }

    /// Returns a copy with every channel clamped to `[0, 1]`.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self::new(
            self.red.clamp(0.0, 1.0),
            self.green.clamp(0.0, 1.0),
            self.blue.clamp(0.0, 1.0),
        )
    }

    /// Returns the clamped color as `#RRGGBB`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_hex(&self) -> String {
        let c = self.clamped();
        let byte = |v: f64| (v * 255.0).round() as u8;
        format!(
            "#{:02X}{:02X}{:02X}",
            byte(c.red),
            byte(c.green),
            byte(c.blue)
        )
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for RgbColor {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
