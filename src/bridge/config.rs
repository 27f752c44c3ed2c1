// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection settings for a bridge.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;

use crate::error::ProtocolError;

/// Connection configuration for a Hue bridge.
///
/// The bridge serves its API over HTTPS with a certificate signed by the
/// vendor's own CA, so certificate validation is relaxed by default.
///
/// # Examples
///
/// ```
/// use lampy::bridge::BridgeConfig;
/// use std::time::Duration;
///
/// // Defaults: HTTPS on port 443, invalid certificates accepted
/// let config = BridgeConfig::new();
///
/// // Plain HTTP on a custom port, e.g. for a local test server
/// let config = BridgeConfig::new()
///     .with_http()
///     .with_port(8080)
///     .with_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    port: u16,
    use_https: bool,
    accept_invalid_certs: bool,
    timeout: Duration,
}

impl BridgeConfig {
    /// Default HTTP port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default HTTPS port.
    pub const DEFAULT_HTTPS_PORT: u16 = 443;
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates the default HTTPS configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            port: Self::DEFAULT_HTTPS_PORT,
            use_https: true,
            accept_invalid_certs: true,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Switches to plain HTTP.
    ///
    /// If the port hasn't been changed from 443, it becomes 80.
    #[must_use]
    pub fn with_http(mut self) -> Self {
        self.use_https = false;
        if self.port == Self::DEFAULT_HTTPS_PORT {
            self.port = Self::DEFAULT_PORT;
        }
        self
    }

    /// Requires a certificate chain that validates against the system roots.
    #[must_use]
    pub fn with_strict_certificates(mut self) -> Self {
        self.accept_invalid_certs = false;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns whether HTTPS is used.
    #[must_use]
    pub fn use_https(&self) -> bool {
        self.use_https
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the base URL for a bridge at `address`.
    #[must_use]
    pub fn base_url(&self, address: IpAddr) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        let host = match address {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{v6}]"),
        };
        let port_suffix = if (self.use_https && self.port == Self::DEFAULT_HTTPS_PORT)
            || (!self.use_https && self.port == Self::DEFAULT_PORT)
        {
            String::new()
        } else {
            format!(":{}", self.port)
        };
        format!("{scheme}://{host}{port_suffix}")
    }

    /// Builds the HTTP client used for every request to the bridge.
    pub(crate) fn build_client(&self) -> Result<Client, ProtocolError> {
        Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()
            .map_err(ProtocolError::Http)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}
