//! Resilient API client.
//!
//! A call runs in at most two phases:
//!
//! ```text
//! attempt ──2xx/non-401──▶ result
//!    │
//!    └─401 (auth call)──▶ refresh ──ok──▶ attempt once more ──▶ result (whatever it is)
//!                            │
//!                            └─fail──▶ clear session ──▶ SessionExpired
//! ```
//!
//! There is no loop: the retry goes straight to [`ApiClient::interpret`], so
//! a misbehaving refresh endpoint can cost at most two attempts plus one
//! refresh round trip.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use sitekit_auth::SessionManager;
use sitekit_core::ClientConfig;

use crate::dto::{RefreshRequest, TokenResponse, to_body};
use crate::endpoints;
use crate::error::{ApiError, ApiResult};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};

/// Why a refresh exchange did not produce a new pair (logged, never returned).
#[derive(Debug, Error)]
enum RefreshError {
    #[error("no refresh token stored")]
    MissingRefreshToken,
    #[error("refresh request failed: {0}")]
    Network(String),
    #[error("refresh rejected with status {0}")]
    Rejected(u16),
    #[error("refresh response did not contain an access token")]
    MalformedResponse,
}

pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionManager>,
    ) -> Self {
        Self {
            config,
            transport,
            session,
        }
    }

    /// Client over a `reqwest` transport using the configured timeout.
    pub fn with_reqwest(config: ClientConfig, session: Arc<SessionManager>) -> ApiResult<Self> {
        let transport = ReqwestTransport::new(config.request_timeout)
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self::new(config, Arc::new(transport), session))
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issue a call against `endpoint` (a path relative to the base URL).
    ///
    /// With `requires_auth`, the stored access token is sent as a bearer
    /// header (omitted entirely when there is none) and a 401 triggers one
    /// refresh exchange followed by exactly one retry.
    pub async fn request(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        requires_auth: bool,
    ) -> ApiResult<Value> {
        let first = self.attempt(endpoint, method, body, requires_auth).await?;
        if first.status != 401 || !requires_auth {
            return Self::interpret(first);
        }

        tracing::debug!(endpoint, "access token rejected; attempting refresh");
        if let Err(err) = self.refresh_tokens().await {
            tracing::warn!(endpoint, error = %err, "token refresh failed; ending session");
            self.session.clear_session();
            return Err(ApiError::SessionExpired);
        }

        let retried = self.attempt(endpoint, method, body, requires_auth).await?;
        Self::interpret(retried)
    }

    pub async fn get(&self, endpoint: &str) -> ApiResult<Value> {
        self.request(endpoint, Method::Get, None, true).await
    }

    pub async fn post(&self, endpoint: &str, body: &Value) -> ApiResult<Value> {
        self.request(endpoint, Method::Post, Some(body), true).await
    }

    pub async fn get_public(&self, endpoint: &str) -> ApiResult<Value> {
        self.request(endpoint, Method::Get, None, false).await
    }

    pub async fn post_public(&self, endpoint: &str, body: &Value) -> ApiResult<Value> {
        self.request(endpoint, Method::Post, Some(body), false).await
    }

    /// `GET` and decode into `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, requires_auth: bool) -> ApiResult<T> {
        let value = self.request(endpoint, Method::Get, None, requires_auth).await?;
        serde_json::from_value(value).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// One outbound call. Only a missing response is an error here; every
    /// HTTP status is handed back to the caller.
    async fn attempt(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        requires_auth: bool,
    ) -> ApiResult<HttpResponse> {
        let mut request = HttpRequest::new(method, self.config.endpoint_url(endpoint));
        if requires_auth {
            if let Some(tokens) = self.session.get_tokens() {
                request = request.bearer(tokens.access_token());
            }
        }
        if let Some(body) = body {
            request = request.json(body.clone());
        }

        match self.transport.send(request).await {
            Ok(response) => {
                tracing::debug!(%method, endpoint, status = response.status, "api call completed");
                Ok(response)
            }
            Err(err) => {
                tracing::warn!(%method, endpoint, error = %err, "api call failed without response");
                Err(ApiError::Network(err.0))
            }
        }
    }

    /// Exchange the stored refresh token for a new pair and store it.
    async fn refresh_tokens(&self) -> Result<(), RefreshError> {
        let current = self
            .session
            .get_tokens()
            .ok_or(RefreshError::MissingRefreshToken)?;
        let body = to_body(&RefreshRequest {
            refresh_token: current.refresh_token(),
        });

        let request = HttpRequest::new(Method::Post, self.config.endpoint_url(endpoints::REFRESH)).json(body);
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| RefreshError::Network(e.0))?;
        if !response.is_success() {
            return Err(RefreshError::Rejected(response.status));
        }

        let pair = serde_json::from_str::<Value>(&response.body)
            .ok()
            .as_ref()
            .and_then(TokenResponse::from_value)
            .and_then(|tokens| tokens.into_refreshed_pair(current.refresh_token()))
            .ok_or(RefreshError::MalformedResponse)?;

        self.session.set_tokens(&pair);
        tracing::info!("access token refreshed");
        Ok(())
    }

    /// Map a received response to the caller-facing result.
    fn interpret(response: HttpResponse) -> ApiResult<Value> {
        if response.is_success() {
            if response.body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&response.body)
                .map_err(|e| ApiError::InvalidResponse(e.to_string()));
        }

        let message = server_message(&response.body)
            .unwrap_or_else(|| format!("error {}", response.status));
        Err(ApiError::http(response.status, message))
    }
}

impl core::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_base_url", &self.config.api_base_url)
            .finish()
    }
}

/// Error text from a JSON error body (`message`, `error` or `detail`).
fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error", "detail"].iter().find_map(|key| {
        let s = value.get(*key)?.as_str()?.trim();
        if s.is_empty() { None } else { Some(s.to_string()) }
    })
}
