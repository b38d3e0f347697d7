//! LLM client shared by the message composer and the resume extractor.
//!
//! Every call carries a `CallPolicy`. Outreach composes under a single short
//! attempt since a template fallback exists; resume structuring has no
//! fallback and is allowed to retry 429/5xx responses.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// How long one caller is willing to wait, and how often to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub attempts: u32,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Delay before the second attempt; doubles afterwards.
    pub backoff: Duration,
}

impl CallPolicy {
    pub const fn single(timeout: Duration) -> Self {
        Self {
            attempts: 1,
            timeout,
            backoff: Duration::ZERO,
        }
    }

    pub const fn retrying(attempts: u32, timeout: Duration, backoff: Duration) -> Self {
        Self {
            attempts,
            timeout,
            backoff,
        }
    }

    /// Sleep before attempt `n` (1-based). Zero for the first attempt.
    fn delay_before(&self, n: u32) -> Duration {
        match n {
            0 | 1 => Duration::ZERO,
            n => self.backoff.saturating_mul(1 << (n - 2).min(16)),
        }
    }

    /// Upper bound on wall time spent inside one call, excluding connect.
    pub fn worst_case(&self) -> Duration {
        let attempts = self.attempts.max(1);
        (1..=attempts).fold(Duration::ZERO, |total, n| {
            total + self.delay_before(n) + self.timeout
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserTurn<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    /// Text of the first non-blank text block.
    fn into_text(self) -> Result<String, LlmError> {
        self.content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .find(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

enum AttemptError {
    /// Worth another attempt: transport failure, 429 or 5xx.
    Transient(LlmError),
    Permanent(LlmError),
}

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    url: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            url: MESSAGES_URL.to_string(),
        })
    }

    /// Sends one user prompt and returns the model's text under `policy`.
    pub async fn complete(
        &self,
        prompt: &str,
        system: &str,
        policy: &CallPolicy,
    ) -> Result<String, LlmError> {
        let request = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: [UserTurn {
                role: "user",
                content: prompt,
            }],
        };
        let attempts = policy.attempts.max(1);

        let mut n = 1;
        loop {
            tokio::time::sleep(policy.delay_before(n)).await;
            match self.attempt(&request, policy.timeout).await {
                Ok(response) => {
                    if let Some(usage) = &response.usage {
                        debug!(
                            input_tokens = usage.input_tokens,
                            output_tokens = usage.output_tokens,
                            attempt = n,
                            "LLM call succeeded"
                        );
                    }
                    return response.into_text();
                }
                Err(AttemptError::Transient(e)) if n < attempts => {
                    warn!(attempt = n, of = attempts, error = %e, "LLM call failed, retrying");
                    n += 1;
                }
                Err(AttemptError::Transient(e) | AttemptError::Permanent(e)) => return Err(e),
            }
        }
    }

    /// `complete`, then parses the text as JSON after removing code fences.
    /// The prompt must ask for JSON only.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
        policy: &CallPolicy,
    ) -> Result<T, LlmError> {
        let text = self.complete(prompt, system, policy).await?;
        Ok(serde_json::from_str(strip_json_fences(&text))?)
    }

    async fn attempt(
        &self,
        request: &MessagesRequest<'_>,
        timeout: Duration,
    ) -> Result<MessagesResponse, AttemptError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| AttemptError::Transient(e.into()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AttemptError::Permanent(e.into()));
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .unwrap_or(body);
        let error = LlmError::Api {
            status: status.as_u16(),
            message,
        };
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Err(AttemptError::Transient(error))
        } else {
            Err(AttemptError::Permanent(error))
        }
    }
}

/// Removes a surrounding ```` ``` ```` or ```` ```json ```` fence, terminated or not.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest).trim_start();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
