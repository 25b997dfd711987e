//! Wire shapes for the auth endpoints.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use sitekit_auth::TokenPair;

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LogoutRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordRequest<'a> {
    pub token: &'a str,
    pub new_password: &'a str,
}

/// Body of `/login` and `/refresh` responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Complete pair, or `None` if either token is missing.
    pub fn into_pair(self) -> Option<TokenPair> {
        TokenPair::new(self.access_token?, self.refresh_token?)
    }

    /// Pair for a refresh exchange: a response without a new refresh token
    /// keeps `previous_refresh`.
    pub fn into_refreshed_pair(self, previous_refresh: &str) -> Option<TokenPair> {
        let refresh = self
            .refresh_token
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| previous_refresh.to_string());
        TokenPair::new(self.access_token?, refresh)
    }

    pub fn is_bearer(&self) -> bool {
        self.token_type
            .as_deref()
            .is_none_or(|t| t.eq_ignore_ascii_case("bearer"))
    }
}

/// Serialize a request body. The request structs above cannot fail to
/// serialize, so a failure maps to `Null` rather than an error path.
pub fn to_body<T: Serialize>(body: &T) -> Value {
    serde_json::to_value(body).unwrap_or(Value::Null)
}

/// Accept identifiers sent either as JSON strings or numbers.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn login_pair_requires_both_tokens() {
        let full = TokenResponse::from_value(&json!({
            "access_token": "a", "refresh_token": "r", "token_type": "bearer"
        }))
        .unwrap();
        assert!(full.is_bearer());
        assert!(full.into_pair().is_some());

        let partial = TokenResponse::from_value(&json!({ "access_token": "a" })).unwrap();
        assert!(partial.into_pair().is_none());
    }

    #[test]
    fn refresh_keeps_previous_refresh_token() {
        let res = TokenResponse::from_value(&json!({ "access_token": "a2" })).unwrap();
        let pair = res.into_refreshed_pair("r1").unwrap();
        assert_eq!(pair.access_token(), "a2");
        assert_eq!(pair.refresh_token(), "r1");

        let missing_access = TokenResponse::from_value(&json!({ "refresh_token": "r2" })).unwrap();
        assert!(missing_access.into_refreshed_pair("r1").is_none());
    }

    #[test]
    fn request_bodies_use_snake_case() {
        assert_eq!(
            to_body(&ResetPasswordRequest { token: "t", new_password: "p" }),
            json!({ "token": "t", "new_password": "p" })
        );
    }
}
