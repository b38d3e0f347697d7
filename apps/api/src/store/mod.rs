//! Persistence for profiles, postings and search runs.
//!
//! Two backends implement the same traits: `MemoryStore` (tests and
//! database-less runs) and `PgStore`. Components depend on `Arc<dyn Store>`
//! so either can be injected.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Posting, Profile, SearchRun};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fails with `Duplicate` when the email is already registered.
    async fn create_profile(&self, profile: &Profile) -> Result<(), StoreError>;

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;

    /// Replaces skills and experience after a resume upload.
    async fn update_resume_fields(
        &self,
        id: Uuid,
        skills: &BTreeSet<String>,
        experience_years: Option<u32>,
    ) -> Result<Profile, StoreError>;
}

#[async_trait]
pub trait PostingStore: Send + Sync {
    async fn list_postings(&self, profile_id: Uuid) -> Result<Vec<Posting>, StoreError>;

    async fn get_posting(&self, id: Uuid) -> Result<Option<Posting>, StoreError>;

    async fn find_posting_by_url(
        &self,
        profile_id: Uuid,
        url: &str,
    ) -> Result<Option<Posting>, StoreError>;

    /// Returns `false` without writing when the profile already has a posting with this url.
    async fn insert_posting(&self, posting: &Posting) -> Result<bool, StoreError>;

    /// Conditionally moves a `Discovered` posting to `Applied`.
    /// Returns `None` when no discovered posting with this id exists.
    async fn mark_applied(
        &self,
        id: Uuid,
        applied_at: DateTime<Utc>,
        contact_override: Option<&str>,
    ) -> Result<Option<Posting>, StoreError>;
}

#[async_trait]
pub trait RunStore: Send + Sync {
    async fn create_run(&self, run: &SearchRun) -> Result<(), StoreError>;

    async fn update_run(&self, run: &SearchRun) -> Result<(), StoreError>;

    async fn get_run(&self, id: Uuid) -> Result<Option<SearchRun>, StoreError>;

    /// Runs for a profile, newest first.
    async fn list_runs(&self, profile_id: Uuid) -> Result<Vec<SearchRun>, StoreError>;

    /// Marks every `pending` or `running` run failed with `reason`.
    /// Returns how many runs were changed.
    async fn fail_unfinished_runs(&self, reason: &str) -> Result<u64, StoreError>;
}

pub trait Store: ProfileStore + PostingStore + RunStore {}

impl<T: ProfileStore + PostingStore + RunStore> Store for T {}
