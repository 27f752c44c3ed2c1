// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge session: locating the bridge, authenticating with it, and
//! issuing authenticated requests.
//!
//! A [`Bridge`] is created either from discovery ([`discovery::resolve`]) or
//! directly from a known address ([`Bridge::new`]). It starts
//! unauthenticated; [`Bridge::authenticate`] runs the link-button handshake
//! and stores the issued credentials inside the session. Only after that
//! can [`Bridge::request`] hand out requests carrying the application key.
//!
//! # Examples
//!
//! ```no_run
//! use lampy::bridge::{AuthOptions, Bridge, BridgeEndpoint, EnvCredentials};
//!
//! # async fn example() -> lampy::Result<()> {
//! let bridge = Bridge::new(BridgeEndpoint::from_address("192.168.1.2".parse().unwrap()))?;
//! bridge
//!     .authenticate(&AuthOptions::new("lampy", "v1.0").with_credential_source(EnvCredentials))
//!     .await?;
//!
//! let light = bridge.light_by_name("Lampy").await?;
//! bridge.set_on(light.id, true).await?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod config;
pub mod discovery;
mod lights;

use std::fmt;
use std::net::IpAddr;

use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;

use crate::error::{Error, ParseError, ProtocolError, Result};

pub use auth::{
    Attempt, AuthOptions, CLIENT_KEY_ENV, CredentialSource, Credentials, EnvCredentials,
    LINK_BUTTON_NOT_PRESSED, PollPolicy, USERNAME_ENV,
};
pub use config::BridgeConfig;
pub use lights::{Dimming, Light, LightColor, LightMetadata, OnState};

use auth::{HandshakeRequest, HandshakeResponse};

/// Header carrying the application key on authenticated requests.
pub const APPLICATION_KEY_HEADER: &str = "hue-application-key";

/// Where a bridge can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeEndpoint {
    address: IpAddr,
    instance_name: Option<String>,
    host_name: Option<String>,
}

impl BridgeEndpoint {
    /// Creates an endpoint with the names learned from discovery.
    #[must_use]
    pub fn new(address: IpAddr, instance_name: Option<String>, host_name: Option<String>) -> Self {
        Self {
            address,
            instance_name,
            host_name,
        }
    }

    /// Creates an endpoint for a statically configured address.
    #[must_use]
    pub fn from_address(address: IpAddr) -> Self {
        Self::new(address, None, None)
    }

    /// Returns the network address.
    #[must_use]
    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// Returns the mDNS instance name, if discovered.
    #[must_use]
    pub fn instance_name(&self) -> Option<&str> {
        self.instance_name.as_deref()
    }

    /// Returns the mDNS host name, if discovered.
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        self.host_name.as_deref()
    }
}

impl fmt::Display for BridgeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance_name {
            Some(name) => write!(f, "{name} ({})", self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

/// Why the last authentication attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The link button was not pressed in time.
    Timeout,
    /// The bridge refused the registration.
    Rejected,
    /// The bridge answered with something that is not a handshake response.
    Unparseable,
    /// The bridge could not be reached.
    Transport,
}

impl AuthFailure {
    fn classify(error: &Error) -> Self {
        match error {
            Error::Timeout { .. } => Self::Timeout,
            Error::Rejected { .. } => Self::Rejected,
            Error::Parse(_) => Self::Unparseable,
            _ => Self::Transport,
        }
    }
}

/// Observable authentication state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No credentials, no handshake running.
    Unauthenticated,
    /// The handshake is polling the bridge.
    Polling,
    /// Credentials are stored.
    Authenticated,
    /// The last handshake ended in a terminal failure.
    Failed(AuthFailure),
}

/// Internal slot; credentials exist only in the authenticated state.
#[derive(Debug, Clone)]
enum Session {
    Unauthenticated,
    Polling,
    Authenticated(Credentials),
    Failed(AuthFailure),
}

/// General bridge information from `GET /api/0/config`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BridgeInfo {
    /// User-assigned bridge name.
    pub name: String,
    /// Unique bridge id.
    #[serde(rename = "bridgeid")]
    pub bridge_id: String,
    /// Version of the REST API.
    #[serde(rename = "apiversion")]
    pub api_version: String,
    /// Firmware version.
    #[serde(rename = "swversion")]
    pub sw_version: String,
    /// Hardware model.
    #[serde(rename = "modelid", default)]
    pub model_id: String,
    /// MAC address.
    #[serde(default)]
    pub mac: String,
}

/// An authenticated (or not yet authenticated) session with one bridge.
pub struct Bridge {
    endpoint: BridgeEndpoint,
    base_url: String,
    client: Client,
    session: RwLock<Session>,
    // Serializes handshakes so racing callers cannot both store credentials.
    auth_gate: tokio::sync::Mutex<()>,
}

impl Bridge {
    /// Creates a session for a known endpoint with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(endpoint: BridgeEndpoint) -> Result<Self> {
        Self::with_config(endpoint, &BridgeConfig::default())
    }

    /// Creates a session for a known endpoint.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn with_config(endpoint: BridgeEndpoint, config: &BridgeConfig) -> Result<Self> {
        let client = config.build_client()?;
        let base_url = config.base_url(endpoint.address());
        Ok(Self {
            endpoint,
            base_url,
            client,
            session: RwLock::new(Session::Unauthenticated),
            auth_gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Discovers the bridge over mDNS and creates a session for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no bridge answered in time.
    #[cfg(feature = "mdns")]
    pub async fn discover(
        options: &discovery::DiscoveryOptions,
        config: &BridgeConfig,
    ) -> Result<Self> {
        let browser = discovery::MdnsBrowser::new()?;
        let endpoint = discovery::resolve(&browser, options).await?;
        Self::with_config(endpoint, config)
    }

    /// Returns the endpoint this session talks to.
    #[must_use]
    pub fn endpoint(&self) -> &BridgeEndpoint {
        &self.endpoint
    }

    /// Returns the base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the current authentication state.
    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        match &*self.session.read() {
            Session::Unauthenticated => AuthState::Unauthenticated,
            Session::Polling => AuthState::Polling,
            Session::Authenticated(_) => AuthState::Authenticated,
            Session::Failed(kind) => AuthState::Failed(*kind),
        }
    }

    /// Returns true if credentials are stored.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(&*self.session.read(), Session::Authenticated(_))
    }

    /// Returns a copy of the stored credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthenticated`] before authentication completed.
    pub fn credentials(&self) -> Result<Credentials> {
        match &*self.session.read() {
            Session::Authenticated(credentials) => Ok(credentials.clone()),
            _ => Err(Error::NotAuthenticated),
        }
    }

    /// Authenticates with the bridge.
    ///
    /// Pre-provisioned credentials from the options' source are used as-is
    /// without contacting the bridge. Otherwise the link-button handshake
    /// polls the bridge following the options' [`PollPolicy`].
    ///
    /// Calling this on an already authenticated session does nothing; use
    /// [`reauthenticate`](Self::reauthenticate) to replace credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the button was not pressed in time,
    /// [`Error::Rejected`] if the bridge refused, or the transport/parse
    /// error of the failing attempt.
    pub async fn authenticate(&self, options: &AuthOptions) -> Result<()> {
        let _gate = self.auth_gate.lock().await;
        if self.is_authenticated() {
            tracing::debug!(bridge = %self.endpoint, "Already authenticated, skipping handshake");
            return Ok(());
        }
        self.handshake(options).await
    }

    /// Discards stored credentials and runs the handshake again.
    ///
    /// # Errors
    ///
    /// Same as [`authenticate`](Self::authenticate).
    pub async fn reauthenticate(&self, options: &AuthOptions) -> Result<()> {
        let _gate = self.auth_gate.lock().await;
        *self.session.write() = Session::Unauthenticated;
        self.handshake(options).await
    }

    async fn handshake(&self, options: &AuthOptions) -> Result<()> {
        if let Some(credentials) = options.preprovisioned() {
            tracing::info!(bridge = %self.endpoint, "Using pre-provisioned credentials");
            *self.session.write() = Session::Authenticated(credentials);
            return Ok(());
        }

        *self.session.write() = Session::Polling;
        let request = HandshakeRequest::new(options.device_type());
        tracing::info!(
            phase = "auth",
            bridge = %self.endpoint,
            device_type = %options.device_type(),
            "Starting link button authentication"
        );

        let result = options
            .poll_policy()
            .run(|| self.register(&request))
            .await;

        match result {
            Ok(credentials) => {
                tracing::info!(bridge = %self.endpoint, "Authenticated with bridge");
                *self.session.write() = Session::Authenticated(credentials);
                Ok(())
            }
            Err(e) => {
                tracing::error!(phase = "auth", bridge = %self.endpoint, error = %e, "Handshake failed");
                *self.session.write() = Session::Failed(AuthFailure::classify(&e));
                Err(e)
            }
        }
    }

    /// One registration attempt.
    async fn register(&self, request: &HandshakeRequest) -> Result<Attempt<Credentials>> {
        let response = self
            .client
            .post(format!("{}/api", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(ProtocolError::Http)?;

        let parsed = match HandshakeResponse::parse(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(ProtocolError::Status {
                    status: status.as_u16(),
                    context: "register application".into(),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        match parsed {
            HandshakeResponse::Success(credentials) => Ok(Attempt::Ready(credentials)),
            HandshakeResponse::Pending => {
                tracing::info!("Link button not pressed, press it to authenticate...");
                Ok(Attempt::Pending)
            }
            HandshakeResponse::Rejected { code, description } => {
                Err(Error::Rejected { code, description })
            }
        }
    }

    /// Builds a request to `path` carrying the application key.
    ///
    /// This is the capability other components use to talk to the bridge's
    /// resource API.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthenticated`] before authentication completed.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let credentials = self.credentials()?;
        Ok(self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header(APPLICATION_KEY_HEADER, credentials.username()))
    }

    /// Fetches general bridge information. Does not need authentication.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response is not a bridge
    /// config document.
    pub async fn info(&self) -> Result<BridgeInfo> {
        let response = self
            .client
            .get(format!("{}/api/0/config", self.base_url))
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        if !response.status().is_success() {
            return Err(ProtocolError::Status {
                status: response.status().as_u16(),
                context: "get bridge config".into(),
            }
            .into());
        }

        let body = response.text().await.map_err(ProtocolError::Http)?;
        serde_json::from_str(&body).map_err(|e| ParseError::Json(e).into())
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("endpoint", &self.endpoint)
            .field("base_url", &self.base_url)
            .field("auth_state", &self.auth_state())
            .finish_non_exhaustive()
    }
}
