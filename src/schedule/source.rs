// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Where calendar documents come from.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::{ProtocolError, Result};

/// A remote calendar document.
#[allow(async_fn_in_trait)]
pub trait CalendarSource {
    /// Downloads the current calendar document.
    ///
    /// # Errors
    ///
    /// Returns error if the document cannot be retrieved.
    async fn fetch(&self) -> Result<String>;
}

/// Calendar published at an HTTP(S) URL, e.g. an iCal export link.
#[derive(Debug, Clone)]
pub struct HttpCalendar {
    url: Url,
    client: Client,
}

impl HttpCalendar {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a source for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidAddress`] if `url` is not a valid URL,
    /// or an HTTP error if the client cannot be created.
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| ProtocolError::InvalidAddress(format!("{url}: {e}")))?;
        let client = Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()
            .map_err(ProtocolError::Http)?;
        Ok(Self { url, client })
    }

    /// Returns the calendar URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl CalendarSource for HttpCalendar {
    async fn fetch(&self) -> Result<String> {
        tracing::debug!(url = %self.url, "Downloading calendar");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        if !response.status().is_success() {
            return Err(ProtocolError::Status {
                status: response.status().as_u16(),
                context: "fetch calendar".into(),
            }
            .into());
        }

        Ok(response.text().await.map_err(ProtocolError::Http)?)
    }
}
