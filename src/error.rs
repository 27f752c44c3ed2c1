// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for lampy.
//!
//! Failures are grouped by where they come from: value validation, the
//! network transport, response and feed parsing, and the bridge session
//! lifecycle (discovery and authentication).

use std::time::Duration;

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Network-level failure talking to the bridge or the calendar host.
    #[error("transport error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A response or calendar feed could not be understood.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// No bridge advertised itself within the discovery window.
    #[error("no bridge found")]
    NotFound,

    /// The link button was not pressed before the authentication deadline.
    #[error("timed out waiting for authentication after {} s", .elapsed.as_secs())]
    Timeout {
        /// Time spent polling before giving up.
        elapsed: Duration,
    },

    /// The bridge refused a request for a reason other than a pending link
    /// button press.
    #[error("rejected by bridge (type {code}): {description}")]
    Rejected {
        /// Bridge error type, or the HTTP status for resource requests.
        code: u16,
        /// Human readable reason reported by the bridge.
        description: String,
    },

    /// An authenticated request was attempted before the handshake completed.
    #[error("bridge session is not authenticated")]
    NotAuthenticated,

    /// No light with the requested name exists on the bridge.
    #[error("light named {name:?} not found")]
    LightNotFound {
        /// The name that was looked up.
        name: String,
    },
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },

    /// Invalid hex color string.
    #[error("invalid hex color: {0}")]
    InvalidHexColor(String),

    /// The color has no chromaticity (X + Y + Z is zero), e.g. pure black.
    #[error("color {0} has no chromaticity")]
    Achromatic(String),
}

/// Errors related to network transport (HTTP and mDNS).
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The mDNS daemon could not be started or queried.
    #[cfg(feature = "mdns")]
    #[error("mDNS error: {0}")]
    Mdns(#[from] mdns_sd::Error),

    /// The server answered with a non-success status code.
    #[error("{context}: HTTP {status}")]
    Status {
        /// HTTP status code returned.
        status: u16,
        /// What the request was trying to do.
        context: String,
    },

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors related to parsing bridge responses and calendar feeds.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected response format.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),

    /// Failed to parse a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
