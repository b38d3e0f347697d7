//! Deduplicating Ingest — merges normalized postings into a profile's set.
//!
//! The check-then-insert sequence for a batch runs under the profile's key
//! lock, so overlapping runs for one profile never insert the same url twice.
//! Batches for different profiles proceed in parallel.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::locks::KeyedLocks;
use crate::models::posting::NewPosting;
use crate::models::Posting;
use crate::store::{Store, StoreError};

pub struct PostingIngest {
    store: Arc<dyn Store>,
    profile_locks: KeyedLocks<Uuid>,
}

impl PostingIngest {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            profile_locks: KeyedLocks::new(),
        }
    }

    /// Inserts every candidate whose url the profile has not seen yet.
    /// Returns the number of postings inserted.
    pub async fn ingest(
        &self,
        profile_id: Uuid,
        candidates: Vec<NewPosting>,
    ) -> Result<usize, StoreError> {
        let _guard = self.profile_locks.acquire(profile_id).await;

        let mut inserted = 0;
        for candidate in candidates {
            if self
                .store
                .find_posting_by_url(profile_id, &candidate.url)
                .await?
                .is_some()
            {
                debug!(%profile_id, url = %candidate.url, "posting already known");
                continue;
            }
            if candidate.contact_derived {
                debug!(%profile_id, url = %candidate.url, contact = %candidate.contact_email, "using derived contact address");
            }
            let posting = Posting::discovered(profile_id, candidate);
            if self.store.insert_posting(&posting).await? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}
