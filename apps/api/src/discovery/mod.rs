// Job discovery: provider rows → normalized postings → deduplicated posting set.
// Runs execute in the background; callers observe them through run records.

pub mod contact;
pub mod handlers;
pub mod ingest;
pub mod normalizer;
pub mod provider;
pub mod runner;
