//! Report records: fetching and client-side filtering.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ApiClient;
use crate::dto::string_or_number;
use crate::endpoints;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only access to reports and categories.
///
/// The list endpoints are bearer-optional: the token is sent (and refreshed
/// on a 401) only while a session exists.
#[derive(Debug)]
pub struct ReportsService {
    api: Arc<ApiClient>,
}

impl ReportsService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    fn with_auth(&self) -> bool {
        self.api.session().is_authenticated()
    }

    pub async fn list(&self) -> ApiResult<Vec<Report>> {
        let payload = self.api.get_json::<Value>(endpoints::REPORTS, self.with_auth()).await?;
        decode_list(payload)
    }

    pub async fn get(&self, id: &str) -> ApiResult<Report> {
        let payload = self
            .api
            .get_json::<Value>(&endpoints::report(id), self.with_auth())
            .await?;
        let record = match payload {
            Value::Object(mut obj) if obj.contains_key("data") && !obj.contains_key("title") => {
                obj.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };
        serde_json::from_value(record).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    pub async fn categories(&self) -> ApiResult<Vec<Category>> {
        let payload = self.api.get_json::<Value>(endpoints::CATEGORIES, self.with_auth()).await?;
        let mut categories: Vec<Category> = decode_list(payload)?;
        for category in &mut categories {
            if category.slug.trim().is_empty() {
                category.slug = slugify(&category.name);
            }
        }
        Ok(categories)
    }
}

/// Accept a bare array or an envelope (`data`, `items`, `results`).
fn decode_list<T: serde::de::DeserializeOwned>(payload: Value) -> ApiResult<Vec<T>> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut obj) => ["data", "items", "results"]
            .iter()
            .find_map(|key| match obj.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| ApiError::InvalidResponse("expected a list of records".into()))?,
        Value::Null => Vec::new(),
        _ => return Err(ApiError::InvalidResponse("expected a list of records".into())),
    };
    serde_json::from_value(Value::Array(items)).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Filtering
// ─────────────────────────────────────────────────────────────────────────────

/// Client-side report filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    /// Category slug or name.
    pub category: Option<String>,
    /// Free text; every whitespace-separated term must appear in the title,
    /// summary or tags.
    pub query: Option<String>,
    pub tag: Option<String>,
}

impl ReportFilter {
    /// Parse `category`, `q` (or `query`) and `tag` from a URL query string,
    /// with or without the leading `?`.
    pub fn from_query_string(raw: &str) -> Self {
        let mut filter = Self::default();
        for pair in raw.trim_start_matches('?').split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(value);
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key {
                "category" => filter.category = Some(value.to_string()),
                "q" | "query" | "search" => filter.query = Some(value.to_string()),
                "tag" => filter.tag = Some(value.to_string()),
                _ => {}
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.query.is_none() && self.tag.is_none()
    }

    pub fn matches(&self, report: &Report) -> bool {
        self.matches_category(report) && self.matches_tag(report) && self.matches_query(report)
    }

    fn matches_category(&self, report: &Report) -> bool {
        let Some(wanted) = &self.category else {
            return true;
        };
        report
            .category
            .as_deref()
            .is_some_and(|have| slugify(have) == slugify(wanted))
    }

    fn matches_tag(&self, report: &Report) -> bool {
        let Some(wanted) = &self.tag else {
            return true;
        };
        report
            .tags
            .iter()
            .any(|tag| tag.trim().eq_ignore_ascii_case(wanted.trim()))
    }

    fn matches_query(&self, report: &Report) -> bool {
        let Some(query) = &self.query else {
            return true;
        };
        let haystack = format!(
            "{} {} {}",
            report.title,
            report.summary.as_deref().unwrap_or_default(),
            report.tags.join(" ")
        )
        .to_lowercase();
        query
            .to_lowercase()
            .split_whitespace()
            .all(|term| haystack.contains(term))
    }
}

/// Reports matching `filter`, in their original order.
pub fn filter_reports<'a>(reports: &'a [Report], filter: &ReportFilter) -> Vec<&'a Report> {
    reports.iter().filter(|report| filter.matches(report)).collect()
}

/// Newest first; undated reports go last, keeping their relative order.
pub fn sort_newest_first(reports: &mut [Report]) {
    reports.sort_by(|a, b| match (a.published_at, b.published_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Lowercase, alphanumeric runs joined by `-` ("Market Trends" → "market-trends").
pub fn slugify(input: &str) -> String {
    input
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
