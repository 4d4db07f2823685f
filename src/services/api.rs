//! Backend API client.
//!
//! One `reqwest::Client` bound to the configured base URL. Every request reads
//! the stored credential (`jwt`) afresh and sends it as a bearer token, so a
//! login or logout through the shared store takes effect on the next call.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{AppError, ErrorResponse};
use crate::models::forecast::LocalizedForecastRecord;
use crate::models::preset::{NewPreset, Preset, PresetCreated};
use crate::models::profile::{LoginRequest, LoginResponse, ProfileUpdate, Registration, UserProfile};
use crate::models::recommendation::{DayOffset, ForecastRequest, Recommendation};
use crate::models::spot::Spot;
use crate::services::localize::ingest_forecasts;
use crate::services::query::{validate_spot_selection, RecommendationQuery};
use crate::services::recommendations::flatten_recommendations;
use crate::storage::KeyValueStore;

/// Store key holding the bearer token.
pub const TOKEN_KEY: &str = "jwt";

/// Turn a profile body into a `UserProfile` owned by `user_id`.
///
/// The id in the request path is authoritative. The body may repeat it as
/// `user_id`, `id`, both, or leave it out.
fn profile_from_body(user_id: &str, body: Value) -> Result<UserProfile, AppError> {
    let Value::Object(mut fields) = body else {
        return Err(AppError::DataShape("profile is not an object".to_string()));
    };

    for key in ["user_id", "id"] {
        let sent = match fields.remove(key) {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => continue,
        };
        if sent != user_id {
            tracing::warn!("Profile for user {} carries {} = {}", user_id, key, sent);
        }
    }
    fields.insert("user_id".to_string(), Value::String(user_id.to_string()));

    serde_json::from_value(Value::Object(fields))
        .map_err(|e| AppError::DataShape(format!("profile: {}", e)))
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    store: Arc<dyn KeyValueStore>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);
        let builder = self.client.request(method, url);

        match self.store.get(TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => builder.bearer_auth(token),
            Ok(_) => builder,
            Err(e) => {
                tracing::warn!("Could not read stored credential: {}", e);
                builder
            }
        }
    }

    async fn dispatch(&self, builder: RequestBuilder, what: &str) -> Result<Response, AppError> {
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Network(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorResponse>()
            .await
            .ok()
            .and_then(ErrorResponse::into_message);
        tracing::warn!("{} returned HTTP {}: {:?}", what, status, message);

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AppError::Unauthorized(message.unwrap_or_else(|| status.to_string()))
            }
            StatusCode::NOT_FOUND => AppError::NotFound(message.unwrap_or_else(|| what.to_string())),
            s if s.is_client_error() => AppError::Rejected(
                message.unwrap_or_else(|| format!("Requisição rejeitada (HTTP {})", s.as_u16())),
            ),
            s => AppError::Server(s),
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T, AppError> {
        let response = self.dispatch(builder, what).await?;
        Ok(response.json::<T>().await?)
    }

    /// `POST /login`. Does not touch the store; the auth holder persists.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let body = LoginRequest { email, password };
        self.fetch(self.request(Method::POST, "/login").json(&body), "login")
            .await
    }

    pub async fn register(&self, registration: &Registration) -> Result<Value, AppError> {
        self.fetch(
            self.request(Method::POST, "/register").json(registration),
            "register",
        )
        .await
    }

    pub async fn profile(&self, user_id: &str) -> Result<UserProfile, AppError> {
        let body: Value = self
            .fetch(
                self.request(Method::GET, &format!("/profile/{}", user_id)),
                "profile",
            )
            .await?;
        profile_from_body(user_id, body)
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, AppError> {
        // answered with either `{user: ...}` or the bare profile
        let mut raw: Value = self
            .fetch(
                self.request(Method::PUT, &format!("/profile/{}", user_id)).json(update),
                "profile update",
            )
            .await?;
        let wrapped = raw.get("user").is_some_and(Value::is_object);
        let body = if wrapped { raw["user"].take() } else { raw };
        profile_from_body(user_id, body)
    }

    pub async fn spots(&self) -> Result<Vec<Spot>, AppError> {
        self.fetch(self.request(Method::GET, "/spots"), "spots").await
    }

    /// `POST /forecasts`, localized and with malformed records dropped.
    pub async fn forecasts(
        &self,
        spot_ids: &[i64],
        day_offsets: &[u32],
    ) -> Result<Vec<LocalizedForecastRecord>, AppError> {
        validate_spot_selection(spot_ids)?;
        let body = ForecastRequest {
            spot_ids,
            day_offset: day_offsets,
        };
        let raw: Value = self
            .fetch(self.request(Method::POST, "/forecasts").json(&body), "forecasts")
            .await?;
        ingest_forecasts(raw)
    }

    pub async fn presets(&self, user_id: &str) -> Result<Vec<Preset>, AppError> {
        self.fetch(
            self.request(Method::GET, "/presets").query(&[("user_id", user_id)]),
            "presets",
        )
        .await
    }

    /// The user's default preset, if any.
    ///
    /// A 404, an empty body or a preset without `preset_id` all mean "none".
    pub async fn default_preset(&self, user_id: &str) -> Result<Option<Preset>, AppError> {
        let result: Result<Value, AppError> = self
            .fetch(
                self.request(Method::GET, "/presets/default")
                    .query(&[("user_id", user_id)]),
                "default preset",
            )
            .await;

        let raw = match result {
            Ok(raw) => raw,
            Err(AppError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        if raw.is_null() {
            return Ok(None);
        }

        let preset: Preset = serde_json::from_value(raw)
            .map_err(|e| AppError::DataShape(format!("default preset: {}", e)))?;
        Ok(preset.preset_id.is_some().then_some(preset))
    }

    /// `POST /presets`; returns the new preset id when the backend reports one.
    pub async fn create_preset(&self, preset: &NewPreset<'_>) -> Result<Option<i64>, AppError> {
        let created: PresetCreated = self
            .fetch(self.request(Method::POST, "/presets").json(preset), "create preset")
            .await?;
        Ok(created.preset_id)
    }

    async fn recommendations(
        &self,
        user_id: &str,
        query: &RecommendationQuery,
        day_offset: DayOffset,
    ) -> Result<Vec<Recommendation>, AppError> {
        let body = query.request(user_id, day_offset);
        let raw: Value = self
            .fetch(
                self.request(Method::POST, "/recommendations").json(&body),
                "recommendations",
            )
            .await?;
        Ok(flatten_recommendations(&raw))
    }

    /// Recommendations for one day; `day_offset` goes out as an integer.
    pub async fn recommendations_for_day(
        &self,
        user_id: &str,
        query: &RecommendationQuery,
        day_offset: u32,
    ) -> Result<Vec<Recommendation>, AppError> {
        self.recommendations(user_id, query, DayOffset::Single(day_offset))
            .await
    }

    /// Recommendations over several days; `day_offset` goes out as a list.
    pub async fn recommendations_for_days(
        &self,
        user_id: &str,
        query: &RecommendationQuery,
        day_offsets: &[u32],
    ) -> Result<Vec<Recommendation>, AppError> {
        self.recommendations(user_id, query, DayOffset::Multiple(day_offsets.to_vec()))
            .await
    }
}
