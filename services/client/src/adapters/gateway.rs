//! services/client/src/adapters/gateway.rs
//!
//! This module contains the HTTP adapter for the backend API.
//! It implements the `BackendApi` port from the `core` crate: one chokepoint
//! that attaches the bearer token, sets the JSON accept header, and normalizes
//! every outcome into a `GatewayError`.

use async_trait::async_trait;
use chrono::Utc;
use nutripet_core::domain::{
    AuthTokens, CharacterStats, Confirmation, EncodedImage, LoginData, Nutrition, Prediction,
    Registration, StatsSnapshot, UserProfile,
};
use nutripet_core::ports::{BackendApi, GatewayError, GatewayResult, TokenStore};
use reqwest::header;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

//=========================================================================================
// Response Envelope
//=========================================================================================

/// The backend's common response envelope: `{status, message, data?}`.
/// Non-2xx and `status: "error"` both signal failure; both are checked.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Normalizes one HTTP response (status code plus body text) into either the
/// typed `data` payload or a `GatewayError`.
fn decode_envelope<T: DeserializeOwned>(http_status: u16, body: &str) -> GatewayResult<T> {
    if http_status == 401 || http_status == 403 {
        return Err(GatewayError::Unauthorized);
    }
    let http_ok = (200..300).contains(&http_status);

    let envelope: RawEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(err) if http_ok => return Err(GatewayError::Malformed(err.to_string())),
        Err(_) => {
            // Failure status with an unparseable body: the status wins.
            return Err(GatewayError::Server {
                status: http_status,
                message: format!("request failed with status {http_status}"),
            });
        }
    };

    if !http_ok || envelope.status != "success" {
        return Err(GatewayError::Server {
            status: http_status,
            message: envelope
                .message
                .unwrap_or_else(|| format!("request failed with status {http_status}")),
        });
    }

    let data = envelope
        .data
        .ok_or_else(|| GatewayError::Malformed("success envelope without data".to_string()))?;
    serde_json::from_value(data).map_err(|err| GatewayError::Malformed(err.to_string()))
}

//=========================================================================================
// Wire Types
//=========================================================================================

// Login answers with a flat record: the profile fields and both tokens
// side by side.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginWire {
    id: i64,
    username: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    access_token: String,
    refresh_token: String,
}

impl From<LoginWire> for LoginData {
    fn from(wire: LoginWire) -> Self {
        LoginData {
            profile: UserProfile {
                id: wire.id,
                username: wire.username,
                full_name: wire.full_name,
                email: wire.email,
            },
            tokens: AuthTokens {
                access_token: wire.access_token,
                refresh_token: wire.refresh_token,
            },
        }
    }
}

// The detection payload nests the recognized food under `predictions`, with
// the nutrition table one level further down (snake_case on this part of the
// API, unlike everything else).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectionWire {
    food_history_id: i64,
    predictions: PredictionsWire,
}

#[derive(Debug, Deserialize)]
struct PredictionsWire {
    predicted_food: String,
    nutrition_info: NutritionInfoWire,
}

#[derive(Debug, Deserialize)]
struct NutritionInfoWire {
    nutrition: Nutrition,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmWire {
    food_history_id: i64,
    character: CharacterStats,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `BackendApi` port over HTTP with `reqwest`.
#[derive(Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl HttpGateway {
    /// Creates a new `HttpGateway` against the given base URL.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends one prepared request and funnels the response through the
    /// envelope check. The bearer token is snapshotted from storage at call
    /// time; a token that changes mid-flight does not affect this request.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> GatewayResult<T> {
        let mut request = request.header(header::ACCEPT, "application/json");

        match self.tokens.load().await {
            Ok(Some(tokens)) => request = request.bearer_auth(tokens.access_token),
            Ok(None) => {}
            Err(err) => warn!("Token storage unreadable, sending without bearer: {}", err),
        }

        let response = request
            .send()
            .await
            .map_err(|err| GatewayError::Network(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| GatewayError::Network(err.to_string()))?;

        decode_envelope(status, &body)
    }
}

//=========================================================================================
// `BackendApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl BackendApi for HttpGateway {
    async fn login(&self, username: &str, password: &str) -> GatewayResult<LoginData> {
        let request = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }));
        let wire: LoginWire = self.execute(request).await?;
        Ok(wire.into())
    }

    async fn register(&self, registration: &Registration) -> GatewayResult<UserProfile> {
        let request = self.http.post(self.url("/users/add")).json(registration);
        self.execute(request).await
    }

    async fn fetch_profile(&self) -> GatewayResult<UserProfile> {
        self.execute(self.http.get(self.url("/users/me"))).await
    }

    async fn detect_food(&self, image: &EncodedImage) -> GatewayResult<Prediction> {
        let part = reqwest::multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|err| GatewayError::Malformed(format!("invalid content type: {err}")))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let request = self
            .http
            .post(self.url("/character/food-detection"))
            .multipart(form);
        let wire: DetectionWire = self.execute(request).await?;

        Ok(Prediction {
            food_history_id: wire.food_history_id,
            predicted_food: wire.predictions.predicted_food,
            nutrition: wire.predictions.nutrition_info.nutrition,
            received_at: Utc::now(),
        })
    }

    async fn confirm_food(&self, food_history_id: i64) -> GatewayResult<Confirmation> {
        let request = self
            .http
            .post(self.url("/character/food-confirm"))
            .json(&json!({ "foodHistoryId": food_history_id, "confirm": true }));
        let wire: ConfirmWire = self.execute(request).await?;

        Ok(Confirmation {
            food_history_id: wire.food_history_id,
            character: wire.character,
        })
    }

    async fn fetch_stats(&self) -> GatewayResult<StatsSnapshot> {
        self.execute(self.http.get(self.url("/character/food-stats")))
            .await
    }
}
