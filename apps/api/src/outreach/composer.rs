//! Message Composer — tailored outreach text for one posting.
//!
//! The LLM-backed composer may fail or return unusable output. The
//! orchestrator then uses `fallback_message`, which depends only on posting
//! and profile fields.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{CallPolicy, LlmClient, LlmError};
use crate::models::{Posting, ProfileSnapshot};
use crate::outreach::prompts::{COMPOSE_PROMPT_TEMPLATE, COMPOSE_SYSTEM};

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Composer unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed composer output: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutreachMessage {
    pub subject: String,
    pub body: String,
}

impl OutreachMessage {
    /// Trims both fields and rejects a blank subject or body.
    pub fn validated(self) -> Result<Self, ComposeError> {
        let subject = self.subject.trim().to_string();
        let body = self.body.trim().to_string();
        if subject.is_empty() {
            return Err(ComposeError::Malformed("empty subject".to_string()));
        }
        if body.is_empty() {
            return Err(ComposeError::Malformed("empty body".to_string()));
        }
        Ok(Self { subject, body })
    }
}

#[async_trait]
pub trait MessageComposer: Send + Sync {
    async fn compose(
        &self,
        profile: &ProfileSnapshot,
        posting: &Posting,
    ) -> Result<OutreachMessage, ComposeError>;
}

/// One short attempt: a slow or failing model means the fallback is used.
pub const COMPOSE_POLICY: CallPolicy = CallPolicy::single(Duration::from_secs(8));

pub struct LlmMessageComposer {
    llm: LlmClient,
}

impl LlmMessageComposer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl MessageComposer for LlmMessageComposer {
    async fn compose(
        &self,
        profile: &ProfileSnapshot,
        posting: &Posting,
    ) -> Result<OutreachMessage, ComposeError> {
        let prompt = build_compose_prompt(profile, posting);
        let system = format!("{COMPOSE_SYSTEM} {JSON_ONLY_SYSTEM}");
        let message: OutreachMessage = self.llm.call_json(&prompt, &system, &COMPOSE_POLICY).await?;
        message.validated()
    }
}

pub fn build_compose_prompt(profile: &ProfileSnapshot, posting: &Posting) -> String {
    COMPOSE_PROMPT_TEMPLATE
        .replace("{candidate_name}", &profile.display_name)
        .replace("{candidate_skills}", &skills_line(profile))
        .replace(
            "{candidate_experience}",
            &profile.experience_years.to_string(),
        )
        .replace("{job_title}", &posting.title)
        .replace("{company}", &posting.company)
        .replace("{job_link}", &posting.url)
}

/// Deterministic template used whenever the composer cannot be used.
pub fn fallback_message(profile: &ProfileSnapshot, posting: &Posting) -> OutreachMessage {
    let name = &profile.display_name;
    let years = profile.experience_years;
    let experience = if profile.skills.is_empty() {
        format!("I have {years} years of experience.")
    } else {
        format!(
            "I have {years} years of experience and skills in {}.",
            skills_line(profile)
        )
    };

    OutreachMessage {
        subject: format!("Application for {} - {name}", posting.title),
        body: format!(
            "Hi,\n\nI am applying for the {} role at {}. {experience}\n\nJob Link: {}\n\nBest,\n{name}",
            posting.title, posting.company, posting.url
        ),
    }
}

fn skills_line(profile: &ProfileSnapshot) -> String {
    profile
        .skills
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::new_posting;
    use uuid::Uuid;

    fn profile(skills: &[&str]) -> ProfileSnapshot {
        ProfileSnapshot {
            profile_id: Uuid::new_v4(),
            display_name: "asha".into(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience_years: 3,
        }
    }

    #[test]
    fn test_fallback_is_deterministic_and_complete() {
        let posting = Posting::discovered(Uuid::new_v4(), new_posting("https://x/1"));
        let profile = profile(&["sql", "python"]);

        let first = fallback_message(&profile, &posting);
        let second = fallback_message(&profile, &posting);
        assert_eq!(first, second);

        assert_eq!(first.subject, "Application for Software Engineer - asha");
        assert!(first.body.contains("3 years of experience and skills in python, sql."));
        assert!(first.body.contains("Job Link: https://x/1"));
        assert!(first.body.contains("at Acme"));
        assert!(first.body.ends_with("asha"));
    }

    #[test]
    fn test_fallback_without_skills() {
        let posting = Posting::discovered(Uuid::new_v4(), new_posting("https://x/1"));
        let message = fallback_message(&profile(&[]), &posting);
        assert!(message.body.contains("I have 3 years of experience.\n"));
        assert!(message.validated().is_ok());
    }

    #[test]
    fn test_validated_rejects_blank_fields() {
        let blank_subject = OutreachMessage {
            subject: " ".into(),
            body: "body".into(),
        };
        assert!(matches!(
            blank_subject.validated(),
            Err(ComposeError::Malformed(_))
        ));

        let trimmed = OutreachMessage {
            subject: " Hello ".into(),
            body: "\nBody\n".into(),
        }
        .validated()
        .unwrap();
        assert_eq!(trimmed.subject, "Hello");
        assert_eq!(trimmed.body, "Body");
    }

    #[test]
    fn test_prompt_has_no_unfilled_placeholders() {
        let posting = Posting::discovered(Uuid::new_v4(), new_posting("https://x/7"));
        let prompt = build_compose_prompt(&profile(&["rust"]), &posting);
        assert!(prompt.contains("Candidate Skills: rust"));
        assert!(prompt.contains("Job Reference/Link: https://x/7"));
        for placeholder in ["{candidate_name}", "{job_title}", "{company}", "{job_link}"] {
            assert!(!prompt.contains(placeholder));
        }
    }
}
