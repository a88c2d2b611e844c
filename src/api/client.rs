//! HTTP client for the Coindeck exchange REST API.
//!
//! One `ApiClient` is shared by the session, push, and market layers. Every
//! request reads the bearer token from the credential store at send time, so
//! a login or logout in one component is visible to the others on their next
//! call without any re-wiring.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::CredentialStore;
use crate::models::{
    AuthEnvelope, Cryptocurrency, DeviceRegisterResponse, DeviceRegistration, DeviceTokenUpdate,
    MarketPricesResponse, PriceHistoryResponse, PricePoint, ProfileResponse, Timeframe,
};

use super::ApiError;

/// Base URL for the exchange API.
const DEFAULT_BASE_URL: &str = "https://api.coindeck.exchange";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Value sent in the X-Platform header on every request.
const PLATFORM: &str = "terminal";

/// API client for the Coindeck exchange.
/// Clones share the underlying reqwest connection pool.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<CredentialStore>,
}

impl ApiClient {
    /// Create a client against the production API host.
    pub fn new(store: Arc<CredentialStore>) -> Result<Self> {
        Self::with_base_url(store, DEFAULT_BASE_URL)
    }

    /// Create a client against a non-default API host.
    pub fn with_base_url(store: Arc<CredentialStore>, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    /// Headers attached to every request. The bearer token is read from the
    /// credential store here, at send time, never cached on the client.
    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert("X-Platform", header::HeaderValue::from_static(PLATFORM));
        headers.insert(
            "X-App-Version",
            header::HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
        );
        headers.insert(
            "X-Device-OS",
            header::HeaderValue::from_static(std::env::consts::OS),
        );
        if let Some(token) = self.store.auth_token() {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Check if a response is successful, returning an error with body if not.
    /// A 401 also clears the stored token, so the next request starts
    /// unauthenticated instead of replaying a dead credential. The request is
    /// never repeated here.
    async fn check_response(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                warn!("Request rejected with 401, clearing stored token");
                self.store.clear_auth_token();
            }
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .with_context(|| format!("Failed to send GET request to {}", url))?;

        let response = self.check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send POST request to {}", url))?;

        let response = self.check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .put(&url)
            .headers(self.auth_headers()?)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send PUT request to {}", url))?;

        let response = self.check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    // ===== Auth =====

    /// POST /api/auth/login. Returns the server envelope untouched; the
    /// session layer decides what, if anything, gets persisted.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthEnvelope> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.post("/api/auth/login", &body).await
    }

    /// POST /api/auth/register. The field set is server-defined, so the body
    /// is passed through as-is.
    pub async fn register(&self, fields: &serde_json::Value) -> Result<AuthEnvelope> {
        self.post("/api/auth/register", fields).await
    }

    /// POST /api/auth/logout. The response body carries nothing the client
    /// uses, so only the status is checked.
    pub async fn logout(&self) -> Result<()> {
        let url = format!("{}/api/auth/logout", self.base_url);
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .context("Failed to send logout request")?;

        self.check_response(response).await?;
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<AuthEnvelope> {
        let body = serde_json::json!({ "email": email });
        self.post("/api/auth/reset-password", &body).await
    }

    // ===== Profile =====

    /// GET /api/user, authenticated by the stored token.
    pub async fn fetch_profile(&self) -> Result<ProfileResponse> {
        self.get("/api/user").await
    }

    pub async fn update_profile(&self, fields: &serde_json::Value) -> Result<ProfileResponse> {
        self.put("/api/user", fields).await
    }

    // ===== Devices =====

    /// POST /api/user/devices. Registers this installation for push delivery
    /// and returns the server-assigned device id.
    pub async fn register_device(
        &self,
        registration: &DeviceRegistration,
    ) -> Result<DeviceRegisterResponse> {
        self.post("/api/user/devices", registration).await
    }

    /// PUT /api/user/devices/{id}. Replaces the push token on an existing
    /// registration.
    pub async fn update_device_token(&self, device_id: &str, token: &str) -> Result<()> {
        let url = format!("{}/api/user/devices/{}", self.base_url, device_id);
        let body = DeviceTokenUpdate {
            token: token.to_string(),
        };
        let response = self
            .client
            .put(&url)
            .headers(self.auth_headers()?)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send device update to {}", url))?;

        self.check_response(response).await?;
        Ok(())
    }

    /// PUT /api/user/devices/{id}/notifications. Enables or disables push
    /// delivery server-side for an existing registration.
    pub async fn set_push_enabled(&self, device_id: &str, enabled: bool) -> Result<()> {
        let url = format!(
            "{}/api/user/devices/{}/notifications",
            self.base_url, device_id
        );
        let body = serde_json::json!({ "enabled": enabled });
        let response = self
            .client
            .put(&url)
            .headers(self.auth_headers()?)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send notification toggle to {}", url))?;

        self.check_response(response).await?;
        Ok(())
    }

    // ===== Market data =====

    pub async fn fetch_market_prices(&self) -> Result<Vec<Cryptocurrency>> {
        let response: MarketPricesResponse = self.get("/api/market/prices").await?;
        Ok(response.cryptocurrencies)
    }

    pub async fn fetch_market_detail(&self, id: &str) -> Result<Cryptocurrency> {
        self.get(&format!("/api/market/prices/{}", id)).await
    }

    /// GET /api/market/prices/{id}/history. The endpoint has returned both a
    /// bare array and a wrapped object over time, so both shapes parse.
    pub async fn fetch_price_history(
        &self,
        id: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<PricePoint>> {
        let url = format!(
            "{}/api/market/prices/{}/history?timeframe={}",
            self.base_url,
            id,
            timeframe.as_query()
        );
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .with_context(|| format!("Failed to send GET request to {}", url))?;

        let response = self.check_response(response).await?;
        let text = response.text().await?;
        debug!(id, timeframe = timeframe.as_query(), "History response received");

        if let Ok(points) = serde_json::from_str::<Vec<PricePoint>>(&text) {
            return Ok(points);
        }

        let wrapped: PriceHistoryResponse =
            serde_json::from_str(&text).context("Failed to parse price history response")?;
        Ok(wrapped.history)
    }
}
