use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application lifecycle of a posting. `Applied` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingStatus {
    Discovered,
    Applied,
}

impl PostingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostingStatus::Discovered => "discovered",
            PostingStatus::Applied => "applied",
        }
    }
}

impl fmt::Display for PostingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovered" => Ok(PostingStatus::Discovered),
            "applied" => Ok(PostingStatus::Applied),
            other => Err(format!("unknown posting status '{other}'")),
        }
    }
}

/// A normalized posting that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPosting {
    pub title: String,
    pub company: String,
    /// Identity key within a profile's posting set.
    pub url: String,
    pub required_skills: String,
    pub required_experience: String,
    pub contact_email: String,
    /// True when the address came from the contact resolver rather than the provider.
    pub contact_derived: bool,
}

/// A persisted job posting for one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub title: String,
    pub company: String,
    pub url: String,
    pub required_skills: String,
    pub required_experience: String,
    pub contact_email: Option<String>,
    pub status: PostingStatus,
    pub applied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Posting {
    /// Materializes a first sighting of `candidate` for `profile_id`.
    pub fn discovered(profile_id: Uuid, candidate: NewPosting) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile_id,
            title: candidate.title,
            company: candidate.company,
            url: candidate.url,
            required_skills: candidate.required_skills,
            required_experience: candidate.required_experience,
            contact_email: Some(candidate.contact_email),
            status: PostingStatus::Discovered,
            applied_at: None,
            created_at: Utc::now(),
        }
    }
}
