use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PostingStore, ProfileStore, RunStore, StoreError};
use crate::models::{Posting, Profile, SearchRun};
use crate::outreach::lifecycle::{apply_transition, is_consistent, SubmitOutreach};

#[derive(Default)]
struct MemoryState {
    profiles: HashMap<Uuid, Profile>,
    postings: HashMap<Uuid, Posting>,
    /// (profile_id, url) → posting id
    posting_urls: HashMap<(Uuid, String), Uuid>,
    runs: HashMap<Uuid, SearchRun>,
}

/// Process-local store. Every write happens under one write lock, so the
/// `(profile_id, url)` uniqueness check and the insert are atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn create_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.profiles.values().any(|p| p.email == profile.email) {
            return Err(StoreError::Duplicate(format!("Profile {}", profile.email)));
        }
        state.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.state.read().await.profiles.get(&id).cloned())
    }

    async fn update_resume_fields(
        &self,
        id: Uuid,
        skills: &BTreeSet<String>,
        experience_years: Option<u32>,
    ) -> Result<Profile, StoreError> {
        let mut state = self.state.write().await;
        let profile = state
            .profiles
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Profile {id}")))?;
        profile.skills = skills.clone();
        profile.experience_years = experience_years;
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }
}

#[async_trait]
impl PostingStore for MemoryStore {
    async fn list_postings(&self, profile_id: Uuid) -> Result<Vec<Posting>, StoreError> {
        let state = self.state.read().await;
        let mut postings: Vec<Posting> = state
            .postings
            .values()
            .filter(|p| p.profile_id == profile_id)
            .cloned()
            .collect();
        postings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.url.cmp(&b.url)));
        Ok(postings)
    }

    async fn get_posting(&self, id: Uuid) -> Result<Option<Posting>, StoreError> {
        Ok(self.state.read().await.postings.get(&id).cloned())
    }

    async fn find_posting_by_url(
        &self,
        profile_id: Uuid,
        url: &str,
    ) -> Result<Option<Posting>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .posting_urls
            .get(&(profile_id, url.to_string()))
            .and_then(|id| state.postings.get(id))
            .cloned())
    }

    async fn insert_posting(&self, posting: &Posting) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let key = (posting.profile_id, posting.url.clone());
        if state.posting_urls.contains_key(&key) {
            return Ok(false);
        }
        state.posting_urls.insert(key, posting.id);
        state.postings.insert(posting.id, posting.clone());
        Ok(true)
    }

    async fn mark_applied(
        &self,
        id: Uuid,
        applied_at: DateTime<Utc>,
        contact_override: Option<&str>,
    ) -> Result<Option<Posting>, StoreError> {
        let mut state = self.state.write().await;
        let Some(posting) = state.postings.get_mut(&id) else {
            return Ok(None);
        };
        let transition = SubmitOutreach {
            posting_id: id,
            applied_at,
            contact_override: contact_override.map(str::to_string),
        };
        match apply_transition(posting, &transition) {
            Ok(()) => {
                debug_assert!(is_consistent(posting));
                Ok(Some(posting.clone()))
            }
            Err(_) => Ok(None),
        }
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn create_run(&self, run: &SearchRun) -> Result<(), StoreError> {
        self.state.write().await.runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn update_run(&self, run: &SearchRun) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        match state.runs.get_mut(&run.id) {
            Some(existing) => {
                *existing = run.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("Run {}", run.id))),
        }
    }

    async fn get_run(&self, id: Uuid) -> Result<Option<SearchRun>, StoreError> {
        Ok(self.state.read().await.runs.get(&id).cloned())
    }

    async fn list_runs(&self, profile_id: Uuid) -> Result<Vec<SearchRun>, StoreError> {
        let state = self.state.read().await;
        let mut runs: Vec<SearchRun> = state
            .runs
            .values()
            .filter(|r| r.profile_id == profile_id)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }

    async fn fail_unfinished_runs(&self, reason: &str) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let mut failed = 0;
        for run in state.runs.values_mut().filter(|r| !r.status.is_terminal()) {
            run.fail(reason);
            failed += 1;
        }
        Ok(failed)
    }
}
