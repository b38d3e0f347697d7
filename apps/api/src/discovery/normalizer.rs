//! Posting Normalizer — one raw provider row to a canonical `NewPosting`.

use thiserror::Error;

use crate::discovery::contact::resolve_contact_email;
use crate::discovery::provider::RawPosting;
use crate::models::posting::NewPosting;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("row is missing required field '{0}'")]
    MissingField(&'static str),
}

/// Validates and canonicalizes a provider row.
///
/// `required_experience` comes from the candidate's requested experience,
/// not from the row, since providers do not expose it reliably.
pub fn normalize(
    raw: &RawPosting,
    requested_experience_years: u32,
) -> Result<NewPosting, NormalizeError> {
    let url = required(&raw.url, "url")?;
    let title = required(&raw.title, "title")?;
    let company = required(&raw.company, "company")?;

    // A supplied address is kept as-is; the orchestrator validates recipients.
    let supplied = raw.email.as_deref().filter(|email| !email.trim().is_empty());
    let (contact_email, contact_derived) = match supplied {
        Some(email) => (email.to_string(), false),
        None => (resolve_contact_email(&company), true),
    };

    let required_skills = raw
        .skills
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    Ok(NewPosting {
        title,
        company,
        url,
        required_skills,
        required_experience: format!("{requested_experience_years}+ years"),
        contact_email,
        contact_derived,
    })
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, NormalizeError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(NormalizeError::MissingField(field))
}
