// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Link-button authentication handshake.
//!
//! A new application registers by posting its device type to `/api`. Until
//! someone presses the link button on the bridge, the bridge answers with
//! error type 101; the request is repeated on a fixed interval until the
//! bridge issues a username and client key, refuses for another reason, or
//! the overall deadline passes.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{Error, ParseError, Result};

/// Bridge error type meaning "link button not pressed".
pub const LINK_BUTTON_NOT_PRESSED: u16 = 101;

/// Environment variable holding a pre-provisioned username.
pub const USERNAME_ENV: &str = "HUE_USERNAME";

/// Environment variable holding a pre-provisioned client key.
pub const CLIENT_KEY_ENV: &str = "HUE_CLIENT_KEY";

/// Application credentials issued by the bridge.
///
/// The `Debug` output never contains the secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    client_key: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, client_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            client_key: client_key.into(),
        }
    }

    /// Returns the username, sent as the application key header.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the client key used for the entertainment streaming API.
    #[must_use]
    pub fn client_key(&self) -> &str {
        &self.client_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"<redacted>")
            .field("client_key", &"<redacted>")
            .finish()
    }
}

/// A source of credentials provisioned outside the handshake.
pub trait CredentialSource: Send + Sync {
    /// Returns a complete credential pair, or `None` to run the handshake.
    fn load(&self) -> Option<Credentials>;
}

/// Reads `HUE_USERNAME` and `HUE_CLIENT_KEY` from the environment.
///
/// Both variables must be set and non-empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn load(&self) -> Option<Credentials> {
        let username = std::env::var(USERNAME_ENV).ok().filter(|v| !v.is_empty())?;
        let client_key = std::env::var(CLIENT_KEY_ENV).ok().filter(|v| !v.is_empty())?;
        Some(Credentials::new(username, client_key))
    }
}

impl CredentialSource for Credentials {
    fn load(&self) -> Option<Credentials> {
        Some(self.clone())
    }
}

/// Outcome of a single polling attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// The operation completed.
    Ready(T),
    /// Not done yet; try again after the interval.
    Pending,
}

/// Fixed-interval polling bounded by a total duration.
///
/// Attempts run strictly one after another. After every pending attempt the
/// policy waits one interval; if the time since the first attempt then
/// exceeds the maximum, polling stops with [`Error::Timeout`]. An attempt
/// that fails ends polling immediately with that error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    max_duration: Duration,
}

impl PollPolicy {
    /// Default wait between attempts.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);
    /// Default total polling time.
    pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(120);

    /// Creates a policy.
    #[must_use]
    pub const fn new(interval: Duration, max_duration: Duration) -> Self {
        Self {
            interval,
            max_duration,
        }
    }

    /// Returns the wait between attempts.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the total polling time.
    #[must_use]
    pub const fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Runs `attempt` until it is ready, fails, or time runs out.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `attempt`, or [`Error::Timeout`].
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Attempt<T>>>,
    {
        let started = Instant::now();
        loop {
            if let Attempt::Ready(value) = attempt().await? {
                return Ok(value);
            }

            tokio::time::sleep(self.interval).await;

            let elapsed = started.elapsed();
            if elapsed > self.max_duration {
                return Err(Error::Timeout { elapsed });
            }
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL, Self::DEFAULT_MAX_DURATION)
    }
}

/// Parameters for [`Bridge::authenticate`](super::Bridge::authenticate).
///
/// # Examples
///
/// ```
/// use lampy::bridge::{AuthOptions, EnvCredentials, PollPolicy};
/// use std::time::Duration;
///
/// let options = AuthOptions::new("lampy", "v1.0")
///     .with_poll_policy(PollPolicy::new(Duration::from_secs(1), Duration::from_secs(30)))
///     .with_credential_source(EnvCredentials);
/// assert_eq!(options.device_type(), "lampy#v1.0");
/// ```
pub struct AuthOptions {
    application_name: String,
    instance_label: String,
    policy: PollPolicy,
    source: Option<Box<dyn CredentialSource>>,
}

impl AuthOptions {
    /// Creates options for the given application and instance label.
    #[must_use]
    pub fn new(application_name: impl Into<String>, instance_label: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            instance_label: instance_label.into(),
            policy: PollPolicy::default(),
            source: None,
        }
    }

    /// Sets the polling policy.
    #[must_use]
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Consults `source` before running the handshake.
    #[must_use]
    pub fn with_credential_source(mut self, source: impl CredentialSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the device type sent to the bridge: `application#instance`.
    #[must_use]
    pub fn device_type(&self) -> String {
        format!("{}#{}", self.application_name, self.instance_label)
    }

    /// Returns the polling policy.
    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        self.policy
    }

    pub(crate) fn preprovisioned(&self) -> Option<Credentials> {
        self.source.as_ref().and_then(|source| source.load())
    }
}

impl fmt::Debug for AuthOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthOptions")
            .field("application_name", &self.application_name)
            .field("instance_label", &self.instance_label)
            .field("policy", &self.policy)
            .field("has_credential_source", &self.source.is_some())
            .finish()
    }
}

/// Body of the registration request.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct HandshakeRequest {
    devicetype: String,
    generateclientkey: bool,
}

impl HandshakeRequest {
    pub(crate) fn new(device_type: String) -> Self {
        Self {
            devicetype: device_type,
            generateclientkey: true,
        }
    }
}

/// Decoded answer to a registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HandshakeResponse {
    Success(Credentials),
    Pending,
    Rejected { code: u16, description: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ResponseEntry {
    Success(SuccessBody),
    Error(ErrorBody),
}

#[derive(Debug, Deserialize)]
struct SuccessBody {
    username: String,
    #[serde(rename = "clientkey")]
    client_key: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    code: u16,
    #[serde(default)]
    description: String,
}

impl HandshakeResponse {
    /// Decodes the JSON array returned by `POST /api`.
    pub(crate) fn parse(body: &str) -> std::result::Result<Self, ParseError> {
        let entries: Vec<ResponseEntry> = serde_json::from_str(body)?;
        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| ParseError::UnexpectedFormat("empty handshake response".into()))?;

        Ok(match entry {
            ResponseEntry::Success(body) => {
                Self::Success(Credentials::new(body.username, body.client_key))
            }
            ResponseEntry::Error(body)
                if body.code == LINK_BUTTON_NOT_PRESSED
                    || body.description == "link button not pressed" =>
            {
                Self::Pending
            }
            ResponseEntry::Error(body) => Self::Rejected {
                code: body.code,
                description: body.description,
            },
        })
    }
}
