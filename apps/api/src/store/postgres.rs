use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{PostingStore, ProfileStore, RunStore, StoreError};
use crate::models::{Posting, Profile, RejectedRow, SearchRun, TermFailure};

/// Postgres-backed store. `UNIQUE (profile_id, url)` and the conditional
/// `status = 'discovered'` update enforce the posting invariants in the schema too.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    skills: Vec<String>,
    experience_years: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let experience_years = row
            .experience_years
            .map(u32::try_from)
            .transpose()
            .map_err(|_| StoreError::Corrupt(format!("profile {} has negative experience", row.id)))?;
        Ok(Profile {
            id: row.id,
            email: row.email,
            skills: row.skills.into_iter().collect(),
            experience_years,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PostingRow {
    id: Uuid,
    profile_id: Uuid,
    title: String,
    company: String,
    url: String,
    required_skills: String,
    required_experience: String,
    contact_email: Option<String>,
    status: String,
    applied_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PostingRow> for Posting {
    type Error = StoreError;

    fn try_from(row: PostingRow) -> Result<Self, Self::Error> {
        Ok(Posting {
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            id: row.id,
            profile_id: row.profile_id,
            title: row.title,
            company: row.company,
            url: row.url,
            required_skills: row.required_skills,
            required_experience: row.required_experience,
            contact_email: row.contact_email,
            applied_at: row.applied_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RunRow {
    id: Uuid,
    profile_id: Uuid,
    status: String,
    query_terms: Vec<String>,
    found_count: i32,
    inserted_count: i32,
    rejected_rows: Json<Vec<RejectedRow>>,
    term_failures: Json<Vec<TermFailure>>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl TryFrom<RunRow> for SearchRun {
    type Error = StoreError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        Ok(SearchRun {
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            id: row.id,
            profile_id: row.profile_id,
            query_terms: row.query_terms,
            found_count: u32::try_from(row.found_count).unwrap_or(0),
            inserted_count: u32::try_from(row.inserted_count).unwrap_or(0),
            rejected_rows: row.rejected_rows.0,
            term_failures: row.term_failures.0,
            error: row.error,
            created_at: row.created_at,
            finished_at: row.finished_at,
        })
    }
}

fn to_db_count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn create_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        let skills: Vec<String> = profile.skills.iter().cloned().collect();
        let result = sqlx::query(
            r#"
            INSERT INTO profiles (id, email, skills, experience_years, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&skills)
        .bind(profile.experience_years.map(to_db_count))
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Duplicate(format!("Profile {}", profile.email)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::try_from)
            .transpose()
    }

    async fn update_resume_fields(
        &self,
        id: Uuid,
        skills: &BTreeSet<String>,
        experience_years: Option<u32>,
    ) -> Result<Profile, StoreError> {
        let skills: Vec<String> = skills.iter().cloned().collect();
        sqlx::query_as::<_, ProfileRow>(
            r#"
            UPDATE profiles
            SET skills = $2, experience_years = $3, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&skills)
        .bind(experience_years.map(to_db_count))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Profile {id}")))
        .and_then(Profile::try_from)
    }
}

#[async_trait]
impl PostingStore for PgStore {
    async fn list_postings(&self, profile_id: Uuid) -> Result<Vec<Posting>, StoreError> {
        sqlx::query_as::<_, PostingRow>(
            "SELECT * FROM postings WHERE profile_id = $1 ORDER BY created_at, url",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Posting::try_from)
        .collect()
    }

    async fn get_posting(&self, id: Uuid) -> Result<Option<Posting>, StoreError> {
        sqlx::query_as::<_, PostingRow>("SELECT * FROM postings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Posting::try_from)
            .transpose()
    }

    async fn find_posting_by_url(
        &self,
        profile_id: Uuid,
        url: &str,
    ) -> Result<Option<Posting>, StoreError> {
        sqlx::query_as::<_, PostingRow>(
            "SELECT * FROM postings WHERE profile_id = $1 AND url = $2",
        )
        .bind(profile_id)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?
        .map(Posting::try_from)
        .transpose()
    }

    async fn insert_posting(&self, posting: &Posting) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO postings
                (id, profile_id, title, company, url, required_skills,
                 required_experience, contact_email, status, applied_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (profile_id, url) DO NOTHING
            "#,
        )
        .bind(posting.id)
        .bind(posting.profile_id)
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(&posting.url)
        .bind(&posting.required_skills)
        .bind(&posting.required_experience)
        .bind(&posting.contact_email)
        .bind(posting.status.as_str())
        .bind(posting.applied_at)
        .bind(posting.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_applied(
        &self,
        id: Uuid,
        applied_at: DateTime<Utc>,
        contact_override: Option<&str>,
    ) -> Result<Option<Posting>, StoreError> {
        sqlx::query_as::<_, PostingRow>(
            r#"
            UPDATE postings
            SET status = 'applied',
                applied_at = $2,
                contact_email = COALESCE($3, contact_email)
            WHERE id = $1 AND status = 'discovered'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(applied_at)
        .bind(contact_override)
        .fetch_optional(&self.pool)
        .await?
        .map(Posting::try_from)
        .transpose()
    }
}

#[async_trait]
impl RunStore for PgStore {
    async fn create_run(&self, run: &SearchRun) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO search_runs
                (id, profile_id, status, query_terms, found_count, inserted_count,
                 rejected_rows, term_failures, error, created_at, finished_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(run.id)
        .bind(run.profile_id)
        .bind(run.status.as_str())
        .bind(&run.query_terms)
        .bind(to_db_count(run.found_count))
        .bind(to_db_count(run.inserted_count))
        .bind(Json(&run.rejected_rows))
        .bind(Json(&run.term_failures))
        .bind(&run.error)
        .bind(run.created_at)
        .bind(run.finished_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_run(&self, run: &SearchRun) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE search_runs
            SET status = $2, query_terms = $3, found_count = $4, inserted_count = $5,
                rejected_rows = $6, term_failures = $7, error = $8, finished_at = $9
            WHERE id = $1
            "#,
        )
        .bind(run.id)
        .bind(run.status.as_str())
        .bind(&run.query_terms)
        .bind(to_db_count(run.found_count))
        .bind(to_db_count(run.inserted_count))
        .bind(Json(&run.rejected_rows))
        .bind(Json(&run.term_failures))
        .bind(&run.error)
        .bind(run.finished_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Run {}", run.id)));
        }
        Ok(())
    }

    async fn get_run(&self, id: Uuid) -> Result<Option<SearchRun>, StoreError> {
        sqlx::query_as::<_, RunRow>("SELECT * FROM search_runs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(SearchRun::try_from)
            .transpose()
    }

    async fn list_runs(&self, profile_id: Uuid) -> Result<Vec<SearchRun>, StoreError> {
        sqlx::query_as::<_, RunRow>(
            "SELECT * FROM search_runs WHERE profile_id = $1 ORDER BY created_at DESC",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(SearchRun::try_from)
        .collect()
    }

    async fn fail_unfinished_runs(&self, reason: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE search_runs
            SET status = 'failed', error = $1, finished_at = now()
            WHERE status IN ('pending', 'running')
            "#,
        )
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
