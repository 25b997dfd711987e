//! Cached user profile.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::permissions::PermissionSet;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("profile payload is not a JSON object")]
    NotAnObject,

    #[error("profile payload is missing '{0}'")]
    MissingField(&'static str),
}

/// The authenticated user as seen by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default)]
    pub permissions: PermissionSet,
}

impl UserProfile {
    /// Build a profile from a `GET /users/me` payload.
    ///
    /// Accepts a bare user object or one wrapped in `{"user": {...}}` /
    /// `{"data": {...}}`. `id` may be a string or a number; the display name
    /// falls back to `name`, then to the email's local part. Permissions never
    /// cause a failure (see [`PermissionSet::from_value`]).
    pub fn from_api(payload: &Value) -> Result<Self, ProfileError> {
        let root = payload.as_object().ok_or(ProfileError::NotAnObject)?;
        let obj = ["user", "data"]
            .iter()
            .find_map(|key| root.get(*key).and_then(Value::as_object))
            .unwrap_or(root);

        let id = match obj.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(ProfileError::MissingField("id")),
        };
        let email = read_string(obj, &["email"]).ok_or(ProfileError::MissingField("email"))?;

        let display_name = read_string(obj, &["display_name", "displayName", "name"])
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        let company_name = read_string(obj, &["company_name", "companyName", "company"]);
        let permissions = PermissionSet::from_value(obj.get("permissions"));

        Ok(Self {
            id,
            email,
            display_name,
            company_name,
            permissions,
        })
    }
}

fn read_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let s = obj.get(*key)?.as_str()?.trim();
        if s.is_empty() { None } else { Some(s.to_string()) }
    })
}
