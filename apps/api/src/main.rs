mod config;
mod db;
mod discovery;
mod errors;
mod llm_client;
mod locks;
mod models;
mod outreach;
mod profiles;
mod routes;
mod state;
mod store;

#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db::create_pool;
use crate::discovery::ingest::PostingIngest;
use crate::discovery::provider::HttpJobSearchProvider;
use crate::discovery::runner::{
    reclaim_interrupted_runs, SearchExecutor, SearchRunner, SearchSettings,
};
use crate::llm_client::LlmClient;
use crate::outreach::composer::{LlmMessageComposer, COMPOSE_POLICY};
use crate::outreach::orchestrator::OutreachOrchestrator;
use crate::outreach::transport::HttpMailTransport;
use crate::profiles::extractor::PdfResumeExtractor;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hireflow API v{}", env!("CARGO_PKG_VERSION"));

    // Storage: Postgres when configured, in-memory otherwise
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            info!("PostgreSQL store initialized");
            Arc::new(PgStore::new(pool))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Search pipeline: provider -> normalizer -> ingest, behind a worker pool
    let provider = Arc::new(HttpJobSearchProvider::new(
        config.search.api_url.clone(),
        config.search.api_key.clone(),
    )?);
    let ingest = Arc::new(PostingIngest::new(store.clone()));
    let executor = Arc::new(SearchExecutor::new(
        provider,
        ingest,
        SearchSettings::from(&config.search),
    ));
    reclaim_interrupted_runs(store.as_ref()).await?;
    let search = SearchRunner::start(store.clone(), executor, config.search.workers);
    info!(workers = config.search.workers, "Search worker pool started");

    // Outreach: LLM composer with template fallback, HTTP mail API transport
    let outreach = Arc::new(
        OutreachOrchestrator::new(
            store.clone(),
            Arc::new(LlmMessageComposer::new(llm.clone())),
            Arc::new(HttpMailTransport::new(&config.mail)?),
        )
        .with_compose_timeout(COMPOSE_POLICY.worst_case() + Duration::from_secs(2)),
    );

    let state = AppState {
        store,
        search,
        outreach,
        resume_extractor: Arc::new(PdfResumeExtractor::new(llm)),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once a frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
