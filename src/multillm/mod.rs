// src/multillm/mod.rs

pub mod broadcast;
pub mod clients;
pub mod config;
pub mod conversation;
pub mod event;
pub mod model_client;
pub mod orchestrator;
pub mod pacing;
#[cfg(feature = "web-server")]
pub mod web_server;

// Let's explicitly export the orchestrator so we don't have to access it via
// multillm::orchestrator::ConversationOrchestrator
pub use orchestrator::ConversationOrchestrator;
