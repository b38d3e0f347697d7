use std::sync::Arc;

use crate::discovery::runner::SearchRunner;
use crate::outreach::orchestrator::OutreachOrchestrator;
use crate::profiles::extractor::ResumeExtractor;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Postgres or in-memory backend, chosen at startup from `DATABASE_URL`.
    pub store: Arc<dyn Store>,
    pub search: SearchRunner,
    pub outreach: Arc<OutreachOrchestrator>,
    pub resume_extractor: Arc<dyn ResumeExtractor>,
}
