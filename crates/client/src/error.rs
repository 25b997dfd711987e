//! Client-facing failure taxonomy.
//!
//! Every API operation returns `Result<_, ApiError>`; callers branch on it
//! instead of catching anything.

use sitekit_core::ValidationError;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";
const NETWORK_USER_MESSAGE: &str =
    "We couldn't reach the server. Check your connection and try again.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No response was received.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response. `message` is the server's, or `error <status>`.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// A 401 that a token refresh could not recover. The session has already
    /// been cleared when this is returned.
    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    SessionExpired,

    /// Local input rejected before any request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// 2xx response whose body was not the expected JSON.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// HTTP status associated with the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::SessionExpired => Some(401),
            ApiError::Network(_) | ApiError::Validation(_) | ApiError::InvalidResponse(_) => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    /// Text suitable for an inline form message.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => NETWORK_USER_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}
