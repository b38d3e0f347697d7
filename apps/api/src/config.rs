use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a number does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` selects the in-memory stores.
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    pub search: SearchConfig,
    pub mail: MailConfig,
    pub port: u16,
    pub rust_log: String,
}

/// Settings for the job search provider and the search worker pool.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub location: String,
    pub results_wanted: u32,
    pub max_age_hours: u32,
    pub max_terms: usize,
    pub workers: usize,
}

/// Settings for the HTTP mail API used as outreach transport.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_token: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            search: SearchConfig {
                api_url: require_env("JOB_SEARCH_API_URL")?,
                api_key: std::env::var("JOB_SEARCH_API_KEY").ok(),
                location: std::env::var("SEARCH_LOCATION").unwrap_or_else(|_| "India".to_string()),
                results_wanted: parse_env("SEARCH_RESULTS_WANTED", 5)?,
                max_age_hours: parse_env("SEARCH_MAX_AGE_HOURS", 72)?,
                max_terms: parse_env("SEARCH_MAX_TERMS", 3)?,
                workers: parse_env("SEARCH_WORKERS", 2)?,
            },
            mail: MailConfig {
                api_url: require_env("MAIL_API_URL")?,
                api_token: require_env("MAIL_API_TOKEN")?,
                from: require_env("MAIL_FROM")?,
            },
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
