//! # multillm
//!
//! multillm runs turn-taking discussions between several remote Large Language Models and
//! streams every step of the discussion to live observers.
//!
//! The crate provides layered abstractions for:
//!
//! * **Model Clients**: the [`ModelClient`] capability, implemented for OpenAI Chat
//!   Completions and the Anthropic Messages API in [`clients`]
//! * **Orchestration**: [`ConversationOrchestrator`] drives the round-robin loop, threading
//!   each successful reply into the next participant's prompt
//! * **Events**: [`event::ConversationEvent`] describes the lifecycle of a run and is emitted
//!   into any [`EventSink`]
//! * **Broadcasting**: [`broadcast::BroadcastHub`] fans events out to every attached observer
//! * **Web Surface**: `web_server` (available on the `web-server` feature) exposes the
//!   orchestrator over HTTP with Server-Sent Events
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use multillm::broadcast::BroadcastHub;
//! use multillm::{ConversationOrchestrator, MultiLlmConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     multillm::init_logger();
//!
//!     let config = MultiLlmConfig::from_env();
//!     let clients = config.build_clients();
//!     let hub = BroadcastHub::default();
//!
//!     let orchestrator = ConversationOrchestrator::new(Arc::new(hub.clone()));
//!     let summary = orchestrator
//!         .start("The future of artificial intelligence and its impact on society", 2, &clients)
//!         .await?;
//!
//!     for turn in &summary.responses {
//!         println!("[round {}] {}: {}", turn.round, turn.model, turn.message);
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// ```rust
/// multillm::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

pub mod multillm;

// Re-exporting key items for easier external access.
pub use crate::multillm::broadcast;
pub use crate::multillm::clients;
pub use crate::multillm::config;
pub use crate::multillm::config::MultiLlmConfig;
pub use crate::multillm::conversation;
pub use crate::multillm::conversation::{ConversationStatus, ConversationSummary, Turn};
pub use crate::multillm::event;
pub use crate::multillm::event::{ConversationEvent, EventSink};
pub use crate::multillm::model_client;
pub use crate::multillm::model_client::{ModelClient, ProviderError};
pub use crate::multillm::orchestrator;
pub use crate::multillm::orchestrator::{ConversationError, ConversationOrchestrator};
pub use crate::multillm::pacing;
#[cfg(feature = "web-server")]
pub use crate::multillm::web_server;
