//! Resume Text Extractor — PDF bytes to `{skills, experience_years}`.
//!
//! Text is pulled with `pdf-extract` on a blocking thread, truncated, and
//! structured by the LLM. An empty skill set is a valid result.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{CallPolicy, LlmClient, LlmError};
use crate::models::profile::normalize_skills;
use crate::profiles::prompts::RESUME_EXTRACTION_PROMPT_TEMPLATE;

/// Characters of resume text sent to the LLM.
const MAX_RESUME_CHARS: usize = 4000;

/// Structuring has no fallback, so transient failures are retried.
const EXTRACT_POLICY: CallPolicy =
    CallPolicy::retrying(3, Duration::from_secs(60), Duration::from_secs(1));

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Could not read PDF: {0}")]
    Pdf(String),

    #[error("Resume contains no extractable text")]
    EmptyDocument,

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedProfile {
    pub skills: BTreeSet<String>,
    pub experience_years: Option<u32>,
}

#[async_trait]
pub trait ResumeExtractor: Send + Sync {
    async fn extract(&self, document: Bytes) -> Result<ExtractedProfile, ExtractError>;
}

pub struct PdfResumeExtractor {
    llm: LlmClient,
}

impl PdfResumeExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[derive(Debug, Deserialize)]
struct LlmExtraction {
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    experience: Value,
}

#[async_trait]
impl ResumeExtractor for PdfResumeExtractor {
    async fn extract(&self, document: Bytes) -> Result<ExtractedProfile, ExtractError> {
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&document))
            .await
            .map_err(|e| ExtractError::Pdf(e.to_string()))?
            .map_err(|e| ExtractError::Pdf(e.to_string()))?;

        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractError::EmptyDocument);
        }
        debug!(chars = text.len(), "resume text extracted");

        let prompt =
            RESUME_EXTRACTION_PROMPT_TEMPLATE.replace("{resume_text}", truncate_chars(text, MAX_RESUME_CHARS));
        let raw: LlmExtraction = self
            .llm
            .call_json(&prompt, JSON_ONLY_SYSTEM, &EXTRACT_POLICY)
            .await?;

        Ok(ExtractedProfile {
            skills: normalize_skills(raw.skills),
            experience_years: parse_experience(&raw.experience),
        })
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Reads years of experience from a number (`3`, `2.5`) or text (`"4+ years"`).
/// Anything without a leading number yields `None`.
fn parse_experience(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.floor() as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_experience_variants() {
        assert_eq!(parse_experience(&json!(3)), Some(3));
        assert_eq!(parse_experience(&json!(2.7)), Some(2));
        assert_eq!(parse_experience(&json!("4+ years")), Some(4));
        assert_eq!(parse_experience(&json!("No experience found")), None);
        assert_eq!(parse_experience(&json!(-1)), None);
        assert_eq!(parse_experience(&Value::Null), None);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_llm_extraction_defaults_missing_keys() {
        let raw: LlmExtraction = serde_json::from_str(r#"{"skills": [" Python ", ""]}"#).unwrap();
        assert_eq!(normalize_skills(raw.skills).into_iter().collect::<Vec<_>>(), vec!["python"]);
        assert_eq!(parse_experience(&raw.experience), None);
    }
}
