// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the bridge session using wiremock.

use std::time::Duration;

use lampy::bridge::{AuthFailure, PollPolicy};
use lampy::{
    AuthOptions, AuthState, Bridge, BridgeConfig, BridgeEndpoint, Brightness, Credentials, Error,
    LightId, ProtocolError, XyColor,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIGHT_ID: &str = "3a6710fa-4474-4eba-b533-5e6e72968feb";

fn bridge_for(server: &MockServer) -> Bridge {
    let address = server.address();
    let config = BridgeConfig::new()
        .with_http()
        .with_port(address.port())
        .with_timeout(Duration::from_secs(2));
    Bridge::with_config(BridgeEndpoint::from_address(address.ip()), &config).unwrap()
}

fn fast_options() -> AuthOptions {
    AuthOptions::new("lampy", "v1.0").with_poll_policy(PollPolicy::new(
        Duration::from_millis(10),
        Duration::from_secs(5),
    ))
}

fn preprovisioned() -> AuthOptions {
    AuthOptions::new("lampy", "v1.0").with_credential_source(Credentials::new("user-abc", "KEY"))
}

fn pending() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!([{
        "error": { "type": 101, "address": "", "description": "link button not pressed" }
    }]))
}

fn success() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!([{
        "success": { "username": "user-abc", "clientkey": "0123456789ABCDEF" }
    }]))
}

// ============================================================================
// Handshake
// ============================================================================

mod handshake {
    use super::*;

    #[tokio::test]
    async fn immediate_success_stores_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .and(body_json(json!({ "devicetype": "lampy#v1.0", "generateclientkey": true })))
            .respond_with(success())
            .expect(1)
            .mount(&server)
            .await;

        let bridge = bridge_for(&server);
        assert_eq!(bridge.auth_state(), AuthState::Unauthenticated);

        bridge.authenticate(&fast_options()).await.unwrap();

        assert_eq!(bridge.auth_state(), AuthState::Authenticated);
        let credentials = bridge.credentials().unwrap();
        assert_eq!(credentials.username(), "user-abc");
        assert_eq!(credentials.client_key(), "0123456789ABCDEF");
    }

    #[tokio::test]
    async fn keeps_polling_until_button_pressed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(pending())
            .up_to_n_times(3)
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(success())
            .expect(1)
            .mount(&server)
            .await;

        let bridge = bridge_for(&server);
        bridge.authenticate(&fast_options()).await.unwrap();
        assert!(bridge.is_authenticated());
    }

    #[tokio::test]
    async fn times_out_while_pending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(pending())
            .mount(&server)
            .await;

        let bridge = bridge_for(&server);
        let options = AuthOptions::new("lampy", "v1.0").with_poll_policy(PollPolicy::new(
            Duration::from_millis(10),
            Duration::from_millis(50),
        ));

        let result = bridge.authenticate(&options).await;
        assert!(matches!(result, Err(Error::Timeout { .. })));
        assert_eq!(bridge.auth_state(), AuthState::Failed(AuthFailure::Timeout));
        assert!(matches!(bridge.credentials(), Err(Error::NotAuthenticated)));
    }

    #[tokio::test]
    async fn other_bridge_error_aborts_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "error": { "type": 7, "address": "/devicetype", "description": "invalid value" }
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let bridge = bridge_for(&server);
        match bridge.authenticate(&fast_options()).await {
            Err(Error::Rejected { code, description }) => {
                assert_eq!(code, 7);
                assert!(description.contains("invalid value"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert_eq!(bridge.auth_state(), AuthState::Failed(AuthFailure::Rejected));
    }

    #[tokio::test]
    async fn unparseable_response_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hello</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let bridge = bridge_for(&server);
        assert!(matches!(
            bridge.authenticate(&fast_options()).await,
            Err(Error::Parse(_))
        ));
        assert_eq!(bridge.auth_state(), AuthState::Failed(AuthFailure::Unparseable));
    }

    #[tokio::test]
    async fn http_error_status_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let bridge = bridge_for(&server);
        assert!(matches!(
            bridge.authenticate(&fast_options()).await,
            Err(Error::Protocol(ProtocolError::Status { status: 503, .. }))
        ));
        assert_eq!(bridge.auth_state(), AuthState::Failed(AuthFailure::Transport));
    }

    #[tokio::test]
    async fn preprovisioned_credentials_skip_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(success())
            .expect(0)
            .mount(&server)
            .await;

        let bridge = bridge_for(&server);
        bridge.authenticate(&preprovisioned()).await.unwrap();
        assert_eq!(bridge.credentials().unwrap().username(), "user-abc");
    }

    #[tokio::test]
    async fn concurrent_authenticate_registers_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(success())
            .expect(1)
            .mount(&server)
            .await;

        let bridge = bridge_for(&server);
        let options = fast_options();
        let (a, b) = tokio::join!(bridge.authenticate(&options), bridge.authenticate(&options));
        a.unwrap();
        b.unwrap();
        assert!(bridge.is_authenticated());
    }

    #[tokio::test]
    async fn reauthenticate_replaces_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(success())
            .expect(1)
            .mount(&server)
            .await;

        let bridge = bridge_for(&server);
        bridge.authenticate(&preprovisioned()).await.unwrap();
        assert_eq!(bridge.credentials().unwrap().client_key(), "KEY");

        bridge.reauthenticate(&fast_options()).await.unwrap();
        assert_eq!(bridge.credentials().unwrap().client_key(), "0123456789ABCDEF");
    }

    #[tokio::test]
    async fn failed_session_can_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_string("garbage"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(success())
            .mount(&server)
            .await;

        let bridge = bridge_for(&server);
        assert!(bridge.authenticate(&fast_options()).await.is_err());
        bridge.authenticate(&fast_options()).await.unwrap();
        assert_eq!(bridge.auth_state(), AuthState::Authenticated);
    }
}

// ============================================================================
// Lights
// ============================================================================

mod lights {
    use super::*;

    fn light_list() -> serde_json::Value {
        json!({
            "errors": [],
            "data": [
                {
                    "id": "11111111-2222-3333-4444-555555555555",
                    "metadata": { "name": "Hall", "archetype": "classic_bulb" },
                    "on": { "on": false },
                    "dimming": { "brightness": 0.0 }
                },
                {
                    "id": LIGHT_ID,
                    "metadata": { "name": "Lampy", "archetype": "sultan_bulb" },
                    "on": { "on": true },
                    "dimming": { "brightness": 100.0 },
                    "color": { "xy": { "x": 0.3, "y": 0.3 }, "gamut_type": "C" }
                }
            ]
        })
    }

    fn updated() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "errors": [],
            "data": [{ "rid": LIGHT_ID, "rtype": "light" }]
        }))
    }

    async fn authenticated(server: &MockServer) -> Bridge {
        let bridge = bridge_for(server);
        bridge.authenticate(&preprovisioned()).await.unwrap();
        bridge
    }

    #[tokio::test]
    async fn requires_authentication() {
        let server = MockServer::start().await;
        let bridge = bridge_for(&server);
        assert!(matches!(bridge.lights().await, Err(Error::NotAuthenticated)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lists_lights_with_application_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip/v2/resource/light"))
            .and(header("hue-application-key", "user-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(light_list()))
            .expect(1)
            .mount(&server)
            .await;

        let bridge = authenticated(&server).await;
        let lights = bridge.lights().await.unwrap();
        assert_eq!(lights.len(), 2);
        assert_eq!(lights[1].metadata.name, "Lampy");
        assert_eq!(lights[1].color.as_ref().unwrap().gamut_type, "C");
    }

    #[tokio::test]
    async fn finds_light_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip/v2/resource/light"))
            .respond_with(ResponseTemplate::new(200).set_body_json(light_list()))
            .mount(&server)
            .await;

        let bridge = authenticated(&server).await;
        let light = bridge.light_by_name("Lampy").await.unwrap();
        assert_eq!(light.id, LIGHT_ID.parse::<LightId>().unwrap());

        match bridge.light_by_name("Kitchen").await {
            Err(Error::LightNotFound { name }) => assert_eq!(name, "Kitchen"),
            other => panic!("expected LightNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn gets_single_light() {
        let server = MockServer::start().await;
        let single = json!({ "errors": [], "data": [light_list()["data"][1].clone()] });
        Mock::given(method("GET"))
            .and(path(format!("/clip/v2/resource/light/{LIGHT_ID}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(single))
            .mount(&server)
            .await;

        let bridge = authenticated(&server).await;
        let light = bridge.light(LIGHT_ID.parse().unwrap()).await.unwrap();
        assert_eq!(light.dimming.unwrap().brightness, 100.0);
    }

    #[tokio::test]
    async fn sends_state_updates() {
        let server = MockServer::start().await;
        let light_path = format!("/clip/v2/resource/light/{LIGHT_ID}");
        Mock::given(method("PUT"))
            .and(path(light_path.as_str()))
            .and(body_json(json!({ "on": { "on": true } })))
            .respond_with(updated())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(light_path.as_str()))
            .and(body_json(json!({ "dimming": { "brightness": 20.0 } })))
            .respond_with(updated())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(light_path.as_str()))
            .and(body_json(json!({ "color": { "xy": { "x": 0.25, "y": 0.5 } } })))
            .respond_with(updated())
            .expect(1)
            .mount(&server)
            .await;

        let bridge = authenticated(&server).await;
        let id: LightId = LIGHT_ID.parse().unwrap();
        bridge.set_on(id, true).await.unwrap();
        bridge
            .set_brightness(id, Brightness::new(20).unwrap())
            .await
            .unwrap();
        bridge.set_color(id, XyColor::new(0.25, 0.5)).await.unwrap();
    }

    #[tokio::test]
    async fn reports_bridge_errors() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errors": [{ "description": "Not Found" }],
                "data": []
            })))
            .mount(&server)
            .await;

        let bridge = authenticated(&server).await;
        match bridge.set_on(LIGHT_ID.parse().unwrap(), false).await {
            Err(Error::Rejected { code, description }) => {
                assert_eq!(code, 404);
                assert!(description.contains("Not Found"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reports_http_status_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let bridge = authenticated(&server).await;
        assert!(matches!(
            bridge.lights().await,
            Err(Error::Protocol(ProtocolError::Status { status: 500, .. }))
        ));
    }
}

// ============================================================================
// Bridge info
// ============================================================================

#[tokio::test]
async fn reads_bridge_info_without_authentication() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/0/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Philips hue",
            "datastoreversion": "163",
            "swversion": "1962154010",
            "apiversion": "1.62.0",
            "mac": "ec:b5:fa:00:00:01",
            "bridgeid": "ECB5FAFFFE000001",
            "factorynew": false,
            "modelid": "BSB002"
        })))
        .mount(&server)
        .await;

    let info = bridge_for(&server).info().await.unwrap();
    assert_eq!(info.name, "Philips hue");
    assert_eq!(info.bridge_id, "ECB5FAFFFE000001");
    assert_eq!(info.api_version, "1.62.0");
    assert_eq!(info.model_id, "BSB002");
}
