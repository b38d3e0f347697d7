use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Candidate profile. Skills and experience stay empty until a resume is parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub skills: BTreeSet<String>,
    pub experience_years: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IncompleteProfile {
    #[error("profile has no skills yet; upload a resume first")]
    MissingSkills,
    #[error("profile has no experience yet; upload a resume first")]
    MissingExperience,
}

/// Read-only view of a profile handed to search runs and the outreach pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSnapshot {
    pub profile_id: Uuid,
    pub display_name: String,
    pub skills: BTreeSet<String>,
    pub experience_years: u32,
}

impl Profile {
    pub fn new(email: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            skills: BTreeSet::new(),
            experience_years: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The local part of the registration email, used to sign outreach.
    pub fn display_name(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }

    /// Snapshot for a search run. Both skills and experience are required.
    pub fn search_snapshot(&self) -> Result<ProfileSnapshot, IncompleteProfile> {
        if self.skills.is_empty() {
            return Err(IncompleteProfile::MissingSkills);
        }
        self.outreach_snapshot()
    }

    /// Snapshot for outreach. Experience is required; an empty skill set is tolerated.
    pub fn outreach_snapshot(&self) -> Result<ProfileSnapshot, IncompleteProfile> {
        let experience_years = self
            .experience_years
            .ok_or(IncompleteProfile::MissingExperience)?;
        Ok(ProfileSnapshot {
            profile_id: self.id,
            display_name: self.display_name().to_string(),
            skills: self.skills.clone(),
            experience_years,
        })
    }
}

/// Canonical skill set: trimmed, lower-cased, blanks dropped.
pub fn normalize_skills<I, S>(skills: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    skills
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
