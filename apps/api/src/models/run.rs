use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "running" => Ok(RunStatus::Running),
            "succeeded" => Ok(RunStatus::Succeeded),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("unknown run status '{other}'")),
        }
    }
}

/// A provider row that could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    pub term: String,
    pub url: Option<String>,
    pub reason: String,
}

/// A query term whose provider call failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermFailure {
    pub term: String,
    pub message: String,
}

/// Result of executing one search run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub query_terms: Vec<String>,
    pub found_count: u32,
    pub inserted_count: u32,
    pub rejected_rows: Vec<RejectedRow>,
    pub term_failures: Vec<TermFailure>,
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn status(&self) -> RunStatus {
        if self.error.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        }
    }
}

/// Observable record of one search run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRun {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub status: RunStatus,
    pub query_terms: Vec<String>,
    pub found_count: u32,
    pub inserted_count: u32,
    pub rejected_rows: Vec<RejectedRow>,
    pub term_failures: Vec<TermFailure>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SearchRun {
    pub fn pending(profile_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile_id,
            status: RunStatus::Pending,
            query_terms: Vec::new(),
            found_count: 0,
            inserted_count: 0,
            rejected_rows: Vec::new(),
            term_failures: Vec::new(),
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Records a terminal outcome.
    pub fn finish(&mut self, outcome: RunOutcome) {
        self.status = outcome.status();
        self.query_terms = outcome.query_terms;
        self.found_count = outcome.found_count;
        self.inserted_count = outcome.inserted_count;
        self.rejected_rows = outcome.rejected_rows;
        self.term_failures = outcome.term_failures;
        self.error = outcome.error;
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
    }
}
