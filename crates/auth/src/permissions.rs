use std::borrow::Borrow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel permission that grants every other permission.
pub const ADMIN_PERMISSION: &str = "admin";

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "reports.view"),
/// normalized to trimmed lowercase so lookups are insensitive to how the API
/// happened to spell them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Permission(String);

impl Permission {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(normalize(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == ADMIN_PERMISSION
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.0
    }
}

impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalized, deduplicated set of permissions held by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a serialized list such as `'["reports.view","admin"]'`.
    ///
    /// Never fails: anything that is not a JSON array yields the empty set,
    /// and non-string entries are skipped.
    pub fn parse_serialized(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(Value::Array(items)) => Self::from_items(&items),
            Ok(_) | Err(_) => {
                if !raw.trim().is_empty() {
                    tracing::debug!("unparseable permission list; treating as empty");
                }
                Self::new()
            }
        }
    }

    /// Read permissions from an API field that may be a serialized string,
    /// a JSON array, or missing/null.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(raw)) => Self::parse_serialized(raw),
            Some(Value::Array(items)) => Self::from_items(items),
            _ => Self::new(),
        }
    }

    fn from_items(items: &[Value]) -> Self {
        items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Self>()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(normalize(name).as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.0.contains(ADMIN_PERMISSION)
    }

    /// True if `name` is held directly or the set contains [`ADMIN_PERMISSION`].
    pub fn grants(&self, name: &str) -> bool {
        self.is_admin() || self.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }
}

impl<S: AsRef<str>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(Permission::new)
                .filter(|p| !p.as_str().is_empty())
                .collect(),
        )
    }
}
