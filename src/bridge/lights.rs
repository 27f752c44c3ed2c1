// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light resources of the v2 (CLIP) API.

use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::{Error, ParseError, ProtocolError, Result};
use crate::types::{Brightness, LightId, XyColor};

use super::Bridge;

const LIGHT_RESOURCE: &str = "/clip/v2/resource/light";

/// A light as reported by the bridge.
///
/// Only the parts this crate acts on are decoded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Light {
    /// Resource id.
    pub id: LightId,
    /// Name and archetype.
    pub metadata: LightMetadata,
    /// Power state.
    pub on: OnState,
    /// Dimming state; absent on non-dimmable lights.
    #[serde(default)]
    pub dimming: Option<Dimming>,
    /// Color state; absent on lights without color support.
    #[serde(default)]
    pub color: Option<LightColor>,
}

/// User-facing light metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LightMetadata {
    /// Name given in the app.
    pub name: String,
    /// Product archetype, e.g. `sultan_bulb`.
    #[serde(default)]
    pub archetype: String,
}

/// Power state of a light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OnState {
    /// Whether the light is on.
    pub on: bool,
}

/// Dimming state of a light.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Dimming {
    /// Brightness percentage.
    pub brightness: f64,
}

/// Color state of a light.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LightColor {
    /// Current chromaticity.
    pub xy: XyColor,
    /// Gamut type reported by the light (`A`, `B`, `C` or `other`).
    #[serde(default)]
    pub gamut_type: String,
}

/// Envelope of every v2 resource response.
#[derive(Debug, Deserialize)]
struct ResourceResponse<T> {
    #[serde(default)]
    errors: Vec<ResourceError>,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ResourceError {
    description: String,
}

impl Bridge {
    /// Lists every light known to the bridge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthenticated`] before authentication, a transport
    /// error if the request fails, or [`Error::Rejected`] if the bridge
    /// reports errors.
    pub async fn lights(&self) -> Result<Vec<Light>> {
        let response = self
            .request(Method::GET, LIGHT_RESOURCE)?
            .send()
            .await
            .map_err(ProtocolError::Http)?;
        decode(response, "list lights").await
    }

    /// Fetches a single light.
    ///
    /// # Errors
    ///
    /// Same as [`lights`](Self::lights); additionally a parse error if the
    /// bridge returned no data.
    pub async fn light(&self, id: LightId) -> Result<Light> {
        let response = self
            .request(Method::GET, &format!("{LIGHT_RESOURCE}/{id}"))?
            .send()
            .await
            .map_err(ProtocolError::Http)?;
        decode::<Light>(response, "get light")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ParseError::UnexpectedFormat(format!("no data for light {id}")).into())
    }

    /// Finds a light by the name given to it in the app.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LightNotFound`] if no light has that name.
    pub async fn light_by_name(&self, name: &str) -> Result<Light> {
        self.lights()
            .await?
            .into_iter()
            .find(|light| light.metadata.name == name)
            .ok_or_else(|| Error::LightNotFound {
                name: name.to_string(),
            })
    }

    /// Turns a light on or off.
    ///
    /// # Errors
    ///
    /// Returns error if the bridge does not accept the update.
    pub async fn set_on(&self, id: LightId, on: bool) -> Result<()> {
        self.update(id, &json!({ "on": { "on": on } }), "toggle light")
            .await
    }

    /// Sets the brightness percentage of a light.
    ///
    /// # Errors
    ///
    /// Returns error if the bridge does not accept the update.
    pub async fn set_brightness(&self, id: LightId, brightness: Brightness) -> Result<()> {
        self.update(
            id,
            &json!({ "dimming": { "brightness": brightness.as_percent() } }),
            "adjust brightness",
        )
        .await
    }

    /// Sets the color of a light by chromaticity.
    ///
    /// # Errors
    ///
    /// Returns error if the bridge does not accept the update.
    pub async fn set_color(&self, id: LightId, xy: XyColor) -> Result<()> {
        self.update(id, &json!({ "color": { "xy": xy } }), "set color")
            .await
    }

    async fn update(&self, id: LightId, body: &serde_json::Value, context: &str) -> Result<()> {
        tracing::debug!(light = %id, body = %body, "Updating light");
        let response = self
            .request(Method::PUT, &format!("{LIGHT_RESOURCE}/{id}"))?
            .json(body)
            .send()
            .await
            .map_err(ProtocolError::Http)?;
        let status = response.status();
        let body = response.text().await.map_err(ProtocolError::Http)?;
        // Only errors matter; the bridge's acknowledgement body is not needed.
        check(status, &body, context)
    }
}

/// Checks the status and unwraps the `data` array of a v2 response.
async fn decode<T: DeserializeOwned>(response: Response, context: &str) -> Result<Vec<T>> {
    let status = response.status();
    let body = response.text().await.map_err(ProtocolError::Http)?;
    check(status, &body, context)?;

    let envelope: ResourceResponse<T> = serde_json::from_str(&body).map_err(ParseError::Json)?;
    Ok(envelope.data)
}

/// Fails on a reported error entry or a non-2xx status.
fn check(status: StatusCode, body: &str, context: &str) -> Result<()> {
    // Error responses usually still carry an errors array worth reporting.
    if let Ok(envelope) = serde_json::from_str::<ResourceResponse<serde_json::Value>>(body) {
        if let Some(first) = envelope.errors.into_iter().next() {
            return Err(Error::Rejected {
                code: status.as_u16(),
                description: format!("{context}: {}", first.description),
            });
        }
    }

    if !status.is_success() {
        return Err(ProtocolError::Status {
            status: status.as_u16(),
            context: context.to_string(),
        }
        .into());
    }
    Ok(())
}
