//! Job search provider — the external source of raw postings.
//!
//! `HttpJobSearchProvider` talks to a JSON search API. Rows are read field by
//! field so one malformed row never fails a whole response; validation is
//! left to the normalizer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

/// One provider row as received. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPosting {
    pub title: Option<String>,
    pub company: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
    pub skills: Vec<String>,
}

impl RawPosting {
    /// Reads a row leniently. Accepts the common aliases providers use
    /// (`job_url`/`link` for `url`, `contact_email` for `email`).
    pub fn from_value(value: &Value) -> Self {
        Self {
            title: string_field(value, &["title", "job_title"]),
            company: string_field(value, &["company", "company_name"]),
            url: string_field(value, &["url", "job_url", "link"]),
            email: string_field(value, &["email", "contact_email"]),
            skills: skills_field(value),
        }
    }
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find_map(|v| v.as_str())
        .map(str::to_string)
}

fn skills_field(value: &Value) -> Vec<String> {
    match value.get("skills") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Parameters for one provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub term: String,
    pub location: String,
    pub limit: u32,
    pub max_age_hours: u32,
}

#[async_trait]
pub trait JobSearchProvider: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawPosting>, ProviderError>;
}

/// Client for a JSON job search API:
/// `GET {base}/search?q=&location=&limit=&hours_old=` returning either a bare
/// array of rows or `{"jobs": [...]}`.
#[derive(Clone)]
pub struct HttpJobSearchProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpJobSearchProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl JobSearchProvider for HttpJobSearchProvider {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawPosting>, ProviderError> {
        let mut request = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", query.term.as_str()),
                ("location", query.location.as_str()),
            ])
            .query(&[("limit", query.limit), ("hours_old", query.max_age_hours)]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await?;
        let rows = parse_rows(body, &query.term)?;
        debug!(term = %query.term, rows = rows.len(), "provider returned rows");
        Ok(rows)
    }
}

/// Extracts rows from a response body. Rows without skills are tagged with
/// the query term that surfaced them.
fn parse_rows(body: Value, term: &str) -> Result<Vec<RawPosting>, ProviderError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("jobs") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(ProviderError::Decode(format!(
                    "'jobs' is not an array: {other}"
                )))
            }
        },
        Value::Null => Vec::new(),
        other => return Err(ProviderError::Decode(format!("unexpected body: {other}"))),
    };

    Ok(items
        .iter()
        .map(|item| {
            let mut row = RawPosting::from_value(item);
            if row.skills.is_empty() {
                row.skills.push(term.to_string());
            }
            row
        })
        .collect())
}
