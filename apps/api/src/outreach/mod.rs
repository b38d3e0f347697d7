pub mod composer;
pub mod handlers;
pub mod lifecycle;
pub mod orchestrator;
pub mod prompts;
pub mod transport;
