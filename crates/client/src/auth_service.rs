//! Login, logout and password-reset flows.
//!
//! These are the callers that write into the session: a successful login
//! stores the token pair, caches the profile and announces `logged-in`.

use std::sync::Arc;

use serde_json::Value;

use sitekit_auth::{SessionManager, UserProfile};
use sitekit_core::{EmailAddress, NewPassword, ValidationError};

use crate::client::ApiClient;
use crate::dto::{
    ForgotPasswordRequest, LoginRequest, LogoutRequest, ResetPasswordRequest, TokenResponse, to_body,
};
use crate::endpoints;
use crate::error::{ApiError, ApiResult};

#[derive(Debug)]
pub struct AuthService {
    api: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    fn session(&self) -> &Arc<SessionManager> {
        self.api.session()
    }

    /// Authenticate and load the user's profile.
    ///
    /// On success the session holds tokens and profile and `logged-in` has
    /// fired exactly once. On failure nothing is left stored and an `error`
    /// event carries the user-facing message.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<UserProfile> {
        let result = self.try_login(email, password).await;
        if let Err(err) = &result {
            tracing::info!(error = %err, "login failed");
            self.session().report_error(err.user_message());
        }
        result
    }

    async fn try_login(&self, email: &str, password: &str) -> ApiResult<UserProfile> {
        let email = EmailAddress::parse(email)?;
        if password.is_empty() {
            return Err(ValidationError::missing("password").into());
        }

        let body = to_body(&LoginRequest {
            email: email.as_str(),
            password,
        });
        let response = self.api.post_public(endpoints::LOGIN, &body).await?;
        let tokens = TokenResponse::from_value(&response)
            .ok_or_else(|| ApiError::InvalidResponse("login response is not an object".into()))?;
        if !tokens.is_bearer() {
            tracing::warn!(
                token_type = tokens.token_type.as_deref().unwrap_or_default(),
                "unexpected token type; sending it as a bearer token anyway"
            );
        }
        let tokens = tokens
            .into_pair()
            .ok_or_else(|| ApiError::InvalidResponse("login response is missing tokens".into()))?;

        self.session().start_session(&tokens);

        let profile = match self.fetch_profile().await {
            Ok(profile) => profile,
            Err(err) => {
                // A half-finished login must not look authenticated.
                if !err.is_session_expired() {
                    self.session().clear_session();
                }
                return Err(err);
            }
        };

        self.session().set_profile(&profile);
        self.session().announce_login(&profile);
        Ok(profile)
    }

    /// End the session. The server call is best effort; local state is
    /// always cleared.
    pub async fn logout(&self) {
        if let Some(tokens) = self.session().get_tokens() {
            let body = to_body(&LogoutRequest {
                refresh_token: tokens.refresh_token(),
            });
            if let Err(err) = self.api.post_public(endpoints::LOGOUT, &body).await {
                tracing::warn!(error = %err, "server logout failed; clearing local session anyway");
            }
        }
        self.session().clear_session();
    }

    /// Ask the server to send a reset link.
    pub async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        let email = EmailAddress::parse(email)?;
        let body = to_body(&ForgotPasswordRequest {
            email: email.as_str(),
        });
        self.api.post_public(endpoints::FORGOT_PASSWORD, &body).await?;
        Ok(())
    }

    /// Complete a reset with the emailed token.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ApiResult<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ValidationError::missing("token").into());
        }
        let password = NewPassword::parse(new_password)?;
        let body = to_body(&ResetPasswordRequest {
            token,
            new_password: password.expose(),
        });
        self.api.post_public(endpoints::RESET_PASSWORD, &body).await?;
        Ok(())
    }

    /// Page-load refresh of the cached profile.
    ///
    /// Returns `None` when anonymous or when the session turned out to be
    /// expired. Any other failure falls back to the cached profile.
    pub async fn restore(&self) -> Option<UserProfile> {
        if !self.session().is_authenticated() {
            return None;
        }
        match self.fetch_profile().await {
            Ok(profile) => {
                self.session().set_profile(&profile);
                Some(profile)
            }
            Err(ApiError::SessionExpired) => None,
            Err(err) => {
                tracing::warn!(error = %err, "profile refresh failed; using cached profile");
                self.session().cached_profile()
            }
        }
    }

    async fn fetch_profile(&self) -> ApiResult<UserProfile> {
        let payload: Value = self.api.get(endpoints::CURRENT_USER).await?;
        UserProfile::from_api(&payload).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}
