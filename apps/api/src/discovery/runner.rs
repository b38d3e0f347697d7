//! Search Job Runner — background discovery runs.
//!
//! ```text
//! submit(profile) ──► SearchRun{pending} persisted ──► mpsc queue
//!                                                        │
//!                     worker pool ◄──────────────────────┘
//!                        ├─► provider.search(term)  (per term, sorted order)
//!                        ├─► normalize(row)         (rejects reported)
//!                        ├─► ingest(batch)          (once per run)
//!                        └─► SearchRun{succeeded|failed} persisted
//! ```
//!
//! A provider failure degrades only its own term. A run fails when every
//! term failed, the ingest could not be committed, or execution panicked.
//! Submission never waits: a full queue rejects the trigger.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::SearchConfig;
use crate::discovery::ingest::PostingIngest;
use crate::discovery::normalizer::normalize;
use crate::discovery::provider::{JobSearchProvider, SearchQuery};
use crate::models::{
    IncompleteProfile, ProfileSnapshot, RejectedRow, RunOutcome, RunStatus, SearchRun,
    TermFailure,
};
use crate::store::{RunStore, Store, StoreError};

/// Query term used when a snapshot carries no skills.
pub const DEFAULT_QUERY_TERM: &str = "AI Engineer";

pub const QUEUE_CAPACITY: usize = 64;

/// Recorded on runs found unfinished at startup.
pub const INTERRUPTED_REASON: &str = "interrupted";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Profile {0} not found")]
    ProfileNotFound(Uuid),

    #[error(transparent)]
    ProfileIncomplete(#[from] IncompleteProfile),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("search queue is full, try again later")]
    QueueFull,

    #[error("search queue is closed")]
    QueueClosed,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub location: String,
    pub results_wanted: u32,
    pub max_age_hours: u32,
    pub max_terms: usize,
}

impl From<&SearchConfig> for SearchSettings {
    fn from(config: &SearchConfig) -> Self {
        Self {
            location: config.location.clone(),
            results_wanted: config.results_wanted,
            max_age_hours: config.max_age_hours,
            max_terms: config.max_terms,
        }
    }
}

/// Query terms for a run: skills in sorted order, capped at `max_terms`.
pub fn derive_query_terms(skills: &BTreeSet<String>, max_terms: usize) -> Vec<String> {
    let terms: Vec<String> = skills.iter().take(max_terms.max(1)).cloned().collect();
    if terms.is_empty() {
        vec![DEFAULT_QUERY_TERM.to_string()]
    } else {
        terms
    }
}

/// Executes one run: provider → normalizer → ingest.
pub struct SearchExecutor {
    provider: Arc<dyn JobSearchProvider>,
    ingest: Arc<PostingIngest>,
    settings: SearchSettings,
}

impl SearchExecutor {
    pub fn new(
        provider: Arc<dyn JobSearchProvider>,
        ingest: Arc<PostingIngest>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            provider,
            ingest,
            settings,
        }
    }

    pub async fn execute(&self, snapshot: &ProfileSnapshot) -> RunOutcome {
        let terms = derive_query_terms(&snapshot.skills, self.settings.max_terms);
        let mut outcome = RunOutcome {
            query_terms: terms.clone(),
            ..RunOutcome::default()
        };
        let mut batch = Vec::new();

        for term in &terms {
            let query = SearchQuery {
                term: term.clone(),
                location: self.settings.location.clone(),
                limit: self.settings.results_wanted,
                max_age_hours: self.settings.max_age_hours,
            };

            let rows = match self.provider.search(&query).await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(profile_id = %snapshot.profile_id, term = %term, error = %e, "provider failed for term");
                    outcome.term_failures.push(TermFailure {
                        term: term.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            for row in rows {
                match normalize(&row, snapshot.experience_years) {
                    Ok(posting) => batch.push(posting),
                    Err(e) => {
                        warn!(profile_id = %snapshot.profile_id, term = %term, error = %e, "rejected provider row");
                        outcome.rejected_rows.push(RejectedRow {
                            term: term.clone(),
                            url: row.url.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        outcome.found_count = u32::try_from(batch.len()).unwrap_or(u32::MAX);

        if outcome.term_failures.len() == terms.len() {
            outcome.error = Some(format!("all {} query terms failed", terms.len()));
            return outcome;
        }

        match self.ingest.ingest(snapshot.profile_id, batch).await {
            Ok(inserted) => {
                outcome.inserted_count = u32::try_from(inserted).unwrap_or(u32::MAX);
            }
            Err(e) => {
                error!(profile_id = %snapshot.profile_id, error = %e, "ingest failed");
                outcome.error = Some(format!("ingest failed: {e}"));
            }
        }
        outcome
    }
}

struct QueuedRun {
    run: SearchRun,
    snapshot: ProfileSnapshot,
}

/// Accepts search triggers and hands them to a fixed pool of workers.
#[derive(Clone)]
pub struct SearchRunner {
    store: Arc<dyn Store>,
    sender: mpsc::Sender<QueuedRun>,
}

impl SearchRunner {
    /// Spawns `workers` worker tasks on the current runtime.
    pub fn start(store: Arc<dyn Store>, executor: Arc<SearchExecutor>, workers: usize) -> Self {
        Self::with_capacity(store, executor, workers, QUEUE_CAPACITY)
    }

    pub fn with_capacity(
        store: Arc<dyn Store>,
        executor: Arc<SearchExecutor>,
        workers: usize,
        capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        for worker_id in 0..workers.max(1) {
            tokio::spawn(worker_loop(
                worker_id,
                store.clone(),
                executor.clone(),
                receiver.clone(),
            ));
        }

        Self { store, sender }
    }

    /// Validates the profile, records a pending run and queues it.
    /// Returns as soon as the run is queued.
    pub async fn submit(&self, profile_id: Uuid) -> Result<SearchRun, SearchError> {
        let profile = self
            .store
            .get_profile(profile_id)
            .await?
            .ok_or(SearchError::ProfileNotFound(profile_id))?;
        let snapshot = profile.search_snapshot()?;

        let mut run = SearchRun::pending(profile_id);
        self.store.create_run(&run).await?;

        let queued = QueuedRun {
            run: run.clone(),
            snapshot,
        };
        if let Err(e) = self.sender.try_send(queued) {
            let rejection = match e {
                TrySendError::Full(_) => SearchError::QueueFull,
                TrySendError::Closed(_) => SearchError::QueueClosed,
            };
            warn!(run_id = %run.id, %profile_id, error = %rejection, "search run rejected");
            run.fail(rejection.to_string());
            if let Err(e) = self.store.update_run(&run).await {
                error!(run_id = %run.id, error = %e, "failed to record rejected run");
            }
            return Err(rejection);
        }

        info!(run_id = %run.id, %profile_id, "search run queued");
        Ok(run)
    }
}

/// Fails runs left `pending` or `running` by a previous process.
/// Call once at startup, before `SearchRunner::start`.
pub async fn reclaim_interrupted_runs<S>(store: &S) -> Result<u64, StoreError>
where
    S: RunStore + ?Sized,
{
    let reclaimed = store.fail_unfinished_runs(INTERRUPTED_REASON).await?;
    if reclaimed > 0 {
        warn!(reclaimed, "marked interrupted search runs as failed");
    }
    Ok(reclaimed)
}

async fn worker_loop(
    worker_id: usize,
    store: Arc<dyn Store>,
    executor: Arc<SearchExecutor>,
    receiver: Arc<Mutex<mpsc::Receiver<QueuedRun>>>,
) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(QueuedRun { mut run, snapshot }) = next else {
            break;
        };

        run.status = RunStatus::Running;
        if let Err(e) = store.update_run(&run).await {
            error!(worker_id, run_id = %run.id, error = %e, "failed to mark run running");
        }

        // Own task, so a panic inside a collaborator fails this run only.
        let task = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.execute(&snapshot).await })
        };
        match task.await {
            Ok(outcome) => run.finish(outcome),
            Err(e) => {
                error!(worker_id, run_id = %run.id, error = %e, "search run aborted");
                run.fail(format!("search run aborted: {e}"));
            }
        }
        debug_assert!(run.status.is_terminal());

        info!(
            worker_id,
            run_id = %run.id,
            profile_id = %run.profile_id,
            status = %run.status,
            found = run.found_count,
            inserted = run.inserted_count,
            rejected = run.rejected_rows.len(),
            failed_terms = run.term_failures.len(),
            "search run finished"
        );

        if let Err(e) = store.update_run(&run).await {
            error!(worker_id, run_id = %run.id, error = %e, "failed to record run outcome");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::PostingStatus;
    use crate::store::{MemoryStore, PostingStore, RunStore};
    use crate::testing::{raw_row, seed_profile, FakeProvider};

    fn settings() -> SearchSettings {
        SearchSettings {
            location: "India".into(),
            results_wanted: 5,
            max_age_hours: 72,
            max_terms: 3,
        }
    }

    fn executor(store: Arc<MemoryStore>, provider: Arc<FakeProvider>) -> Arc<SearchExecutor> {
        let ingest = Arc::new(PostingIngest::new(store));
        Arc::new(SearchExecutor::new(provider, ingest, settings()))
    }

    async fn wait_for_terminal(store: &MemoryStore, run_id: Uuid) -> SearchRun {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let run = store.get_run(run_id).await.unwrap().unwrap();
                if run.status.is_terminal() {
                    return run;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("run reaches a terminal state")
    }

    fn snapshot(profile_id: Uuid, skills: &[&str]) -> ProfileSnapshot {
        ProfileSnapshot {
            profile_id,
            display_name: "dev".into(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience_years: 3,
        }
    }

    #[test]
    fn test_query_terms_sorted_and_capped() {
        let skills: BTreeSet<String> = ["sql", "python", "rust", "go"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(derive_query_terms(&skills, 2), vec!["go", "python"]);
        assert_eq!(derive_query_terms(&skills, 0), vec!["go"]);
    }

    #[test]
    fn test_query_terms_default_when_no_skills() {
        assert_eq!(
            derive_query_terms(&BTreeSet::new(), 3),
            vec![DEFAULT_QUERY_TERM.to_string()]
        );
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_single_term() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(
            FakeProvider::new()
                .fail("python", "timeout")
                .respond("rust", vec![raw_row("Rust Dev", "Ferrous Ltd", "https://x/9")]),
        );
        let profile_id = Uuid::new_v4();

        let outcome = executor(store.clone(), provider.clone())
            .execute(&snapshot(profile_id, &["rust", "python"]))
            .await;

        assert_eq!(outcome.status(), RunStatus::Succeeded);
        assert_eq!(outcome.query_terms, vec!["python", "rust"]);
        assert_eq!(outcome.term_failures.len(), 1);
        assert_eq!(outcome.term_failures[0].term, "python");
        assert_eq!(outcome.found_count, 1);
        assert_eq!(outcome.inserted_count, 1);

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].location, "India");
        assert_eq!(calls[1].limit, 5);
        assert_eq!(calls[1].max_age_hours, 72);

        let postings = store.list_postings(profile_id).await.unwrap();
        assert_eq!(postings[0].contact_email.as_deref(), Some("hr@ferrous.com"));
        assert_eq!(postings[0].required_experience, "3+ years");
        assert_eq!(postings[0].status, PostingStatus::Discovered);
    }

    #[tokio::test]
    async fn test_all_terms_failing_fails_run() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(FakeProvider::new().fail("python", "down"));

        let outcome = executor(store, provider)
            .execute(&snapshot(Uuid::new_v4(), &["python"]))
            .await;

        assert_eq!(outcome.status(), RunStatus::Failed);
        assert_eq!(outcome.error.as_deref(), Some("all 1 query terms failed"));
    }

    #[tokio::test]
    async fn test_rows_without_url_are_reported() {
        let store = Arc::new(MemoryStore::new());
        let mut missing_url = raw_row("Analyst", "Initech", "");
        missing_url.url = None;
        let provider = Arc::new(FakeProvider::new().respond(
            "python",
            vec![missing_url, raw_row("Engineer", "Initech", "https://x/1")],
        ));

        let outcome = executor(store, provider)
            .execute(&snapshot(Uuid::new_v4(), &["python"]))
            .await;

        assert_eq!(outcome.status(), RunStatus::Succeeded);
        assert_eq!(outcome.found_count, 1);
        assert_eq!(outcome.rejected_rows.len(), 1);
        assert_eq!(outcome.rejected_rows[0].reason, "row is missing required field 'url'");
    }

    #[tokio::test]
    async fn test_same_url_across_two_runs_is_stored_once() {
        let store = Arc::new(MemoryStore::new());
        let profile = seed_profile(&store, "dev@example.com", &["python"], Some(3)).await;
        let provider = Arc::new(
            FakeProvider::new().respond("python", vec![raw_row("ML Engineer", "Acme", "https://x/1")]),
        );
        let runner = SearchRunner::start(store.clone(), executor(store.clone(), provider), 2);

        let first = runner.submit(profile.id).await.unwrap();
        let first = wait_for_terminal(&store, first.id).await;
        let second = runner.submit(profile.id).await.unwrap();
        let second = wait_for_terminal(&store, second.id).await;

        assert_eq!(first.status, RunStatus::Succeeded);
        assert_eq!(first.inserted_count, 1);
        assert_eq!(second.status, RunStatus::Succeeded);
        assert_eq!(second.found_count, 1);
        assert_eq!(second.inserted_count, 0);

        let postings = store.list_postings(profile.id).await.unwrap();
        assert_eq!(postings.iter().filter(|p| p.url == "https://x/1").count(), 1);

        let runs = store.list_runs(profile.id).await.unwrap();
        assert_eq!(runs.len(), 2);
    }

    #[tokio::test]
    async fn test_submit_returns_before_run_completes() {
        let store = Arc::new(MemoryStore::new());
        let profile = seed_profile(&store, "dev@example.com", &["python"], Some(1)).await;
        let provider = Arc::new(FakeProvider::new().respond("python", vec![]));
        let runner = SearchRunner::start(store.clone(), executor(store.clone(), provider), 1);

        let run = runner.submit(profile.id).await.unwrap();
        assert_eq!(run.status, RunStatus::Pending);
        assert!(store.get_run(run.id).await.unwrap().is_some());

        let finished = wait_for_terminal(&store, run.id).await;
        assert_eq!(finished.status, RunStatus::Succeeded);
        assert!(finished.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_submit_rejects_unknown_and_incomplete_profiles() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(FakeProvider::new());
        let runner = SearchRunner::start(store.clone(), executor(store.clone(), provider), 1);

        assert!(matches!(
            runner.submit(Uuid::new_v4()).await,
            Err(SearchError::ProfileNotFound(_))
        ));

        let no_skills = seed_profile(&store, "a@example.com", &[], Some(2)).await;
        assert!(matches!(
            runner.submit(no_skills.id).await,
            Err(SearchError::ProfileIncomplete(IncompleteProfile::MissingSkills))
        ));

        let no_experience = seed_profile(&store, "b@example.com", &["go"], None).await;
        assert!(matches!(
            runner.submit(no_experience.id).await,
            Err(SearchError::ProfileIncomplete(IncompleteProfile::MissingExperience))
        ));

        assert!(store.list_runs(no_skills.id).await.unwrap().is_empty());
    }

    struct PanickingProvider;

    #[async_trait::async_trait]
    impl JobSearchProvider for PanickingProvider {
        async fn search(
            &self,
            _query: &SearchQuery,
        ) -> Result<Vec<crate::discovery::provider::RawPosting>, crate::discovery::provider::ProviderError>
        {
            panic!("provider blew up");
        }
    }

    #[tokio::test]
    async fn test_submit_never_waits_on_a_full_queue() {
        let store = Arc::new(MemoryStore::new());
        let profile = seed_profile(&store, "dev@example.com", &["python"], Some(3)).await;
        let provider = Arc::new(
            FakeProvider::new()
                .respond("python", vec![])
                .with_delay(Duration::from_secs(3600)),
        );
        let runner =
            SearchRunner::with_capacity(store.clone(), executor(store.clone(), provider), 1, 2);

        let mut rejected = None;
        for _ in 0..6 {
            let submitted = tokio::time::timeout(Duration::from_millis(500), runner.submit(profile.id))
                .await
                .expect("submit returns without waiting for a worker");
            if let Err(e) = submitted {
                rejected = Some(e);
                break;
            }
        }
        assert!(matches!(rejected, Some(SearchError::QueueFull)));

        let runs = store.list_runs(profile.id).await.unwrap();
        let failed: Vec<_> = runs
            .iter()
            .filter(|r| r.status == RunStatus::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(
            failed[0].error.as_deref(),
            Some("search queue is full, try again later")
        );
    }

    #[tokio::test]
    async fn test_panicking_run_is_failed_and_pool_survives() {
        let store = Arc::new(MemoryStore::new());
        let profile = seed_profile(&store, "dev@example.com", &["python"], Some(3)).await;
        let ingest = Arc::new(PostingIngest::new(store.clone()));
        let executor = Arc::new(SearchExecutor::new(Arc::new(PanickingProvider), ingest, settings()));
        let runner = SearchRunner::start(store.clone(), executor, 1);

        for _ in 0..2 {
            let run = runner.submit(profile.id).await.unwrap();
            let run = wait_for_terminal(&store, run.id).await;
            assert_eq!(run.status, RunStatus::Failed);
            assert!(run.error.unwrap().starts_with("search run aborted"));
            assert!(run.finished_at.is_some());
        }
    }

    #[tokio::test]
    async fn test_reclaim_fails_only_unfinished_runs() {
        let store = MemoryStore::new();
        let profile_id = Uuid::new_v4();

        let pending = SearchRun::pending(profile_id);
        let mut running = SearchRun::pending(profile_id);
        running.status = RunStatus::Running;
        let mut done = SearchRun::pending(profile_id);
        done.finish(RunOutcome::default());
        for run in [&pending, &running, &done] {
            store.create_run(run).await.unwrap();
        }

        assert_eq!(reclaim_interrupted_runs(&store).await.unwrap(), 2);

        for id in [pending.id, running.id] {
            let run = store.get_run(id).await.unwrap().unwrap();
            assert_eq!(run.status, RunStatus::Failed);
            assert_eq!(run.error.as_deref(), Some(INTERRUPTED_REASON));
        }
        let untouched = store.get_run(done.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, RunStatus::Succeeded);
        assert_eq!(reclaim_interrupted_runs(&store).await.unwrap(), 0);
    }
}
