//! Round-robin discussion between model clients.
//!
//! The [`ConversationOrchestrator`] seeds a running prompt from the topic, then for every
//! round hands that prompt to each available [`ModelClient`] in list order. Each successful
//! reply becomes the prompt for the next participant, so later speakers always react to the
//! most recent idea rather than to a private thread. A failed call is reported and skipped;
//! it never aborts the run and never touches the running prompt.
//!
//! # Event Flow
//!
//! ```text
//! conversation_start { topic, rounds }
//!   └─ round_start { round: 1, totalRounds }
//!       ├─ model_thinking { model: A }
//!       ├─ model_response { model: A, response }   (or error { message, round })
//!       ├─ model_thinking { model: B }
//!       └─ model_response { model: B, response }
//!   └─ round_start { round: 2, totalRounds }
//!       └─ ...
//! conversation_end {}
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use multillm::event::NoopSink;
//! use multillm::model_client::{ModelClient, ProviderError};
//! use multillm::orchestrator::ConversationOrchestrator;
//!
//! struct Parrot(&'static str);
//!
//! #[async_trait]
//! impl ModelClient for Parrot {
//!     fn model_name(&self) -> &str { self.0 }
//!     async fn converse(&self, prompt: &str) -> Result<String, ProviderError> {
//!         Ok(format!("{} heard: {}", self.0, prompt))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let clients: Vec<Arc<dyn ModelClient>> = vec![Arc::new(Parrot("A")), Arc::new(Parrot("B"))];
//! let orchestrator = ConversationOrchestrator::new(Arc::new(NoopSink));
//!
//! let summary = orchestrator.start("tea", 1, &clients).await.unwrap();
//! assert_eq!(summary.responses[1].message, "B heard: A heard: Let's discuss: tea");
//! # }
//! ```

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::conversation::{Conversation, ConversationStatus, ConversationSummary, Turn};
use crate::event::{ConversationEvent, EventSink};
use crate::model_client::ModelClient;
use crate::pacing::{NoPacing, Pacing};

/// Seed prompt used when no template is configured. `{topic}` is replaced by the topic.
pub const DEFAULT_SEED_TEMPLATE: &str = "Let's discuss: {topic}";

/// Errors that reject a run before it begins.
///
/// ```
/// use multillm::orchestrator::ConversationError;
///
/// let err = ConversationError::InvalidArgument("rounds must be at least 1".into());
/// assert_eq!(err.to_string(), "Invalid argument: rounds must be at least 1");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationError {
    /// Malformed input to [`ConversationOrchestrator::start`]; no event was emitted.
    InvalidArgument(String),
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl Error for ConversationError {}

/// Drives one or more independent discussion runs against an injected [`EventSink`].
///
/// The orchestrator holds no per-run state, so one instance can serve concurrent runs;
/// each call to [`start`](ConversationOrchestrator::start) owns its own
/// [`Conversation`] and running prompt.
#[derive(Clone)]
pub struct ConversationOrchestrator {
    sink: Arc<dyn EventSink>,
    pacing: Arc<dyn Pacing>,
    seed_template: String,
    cancellation: CancellationToken,
}

impl ConversationOrchestrator {
    /// Create an orchestrator emitting into `sink`, with no pacing and the default seed
    /// template.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        ConversationOrchestrator {
            sink,
            pacing: Arc::new(NoPacing),
            seed_template: DEFAULT_SEED_TEMPLATE.to_string(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Pause strategy applied after each successful call (builder pattern).
    pub fn with_pacing(mut self, pacing: Arc<dyn Pacing>) -> Self {
        self.pacing = pacing;
        self
    }

    /// Override the seed prompt template (builder pattern). `{topic}` is substituted.
    pub fn with_seed_template(mut self, template: impl Into<String>) -> Self {
        self.seed_template = template.into();
        self
    }

    /// Stop the run cooperatively once `token` is cancelled (builder pattern).
    ///
    /// Outstanding model calls and pauses are abandoned, no further call is made and no
    /// further event is emitted. The summary reports [`ConversationStatus::Cancelled`].
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Render the first prompt of a discussion about `topic`.
    pub fn seed_prompt(&self, topic: &str) -> String {
        self.seed_template.replace("{topic}", topic)
    }

    async fn emit(&self, event: ConversationEvent) {
        log::debug!(
            "ConversationOrchestrator::emit(...): {} {}",
            event.event_type(),
            event.payload()
        );
        self.sink.emit(&event).await;
    }

    /// Run a discussion of `rounds` rounds about `topic` between `clients`.
    ///
    /// Unavailable clients are skipped. Provider failures are reported as `error` events
    /// and the run continues; the only failure of `start` itself is
    /// [`ConversationError::InvalidArgument`] for `rounds == 0`, raised before any event.
    pub async fn start(
        &self,
        topic: &str,
        rounds: usize,
        clients: &[Arc<dyn ModelClient>],
    ) -> Result<ConversationSummary, ConversationError> {
        if rounds < 1 {
            return Err(ConversationError::InvalidArgument(format!(
                "rounds must be at least 1, got {}",
                rounds
            )));
        }

        let mut conversation = Conversation::new(topic, rounds);
        let active: Vec<&Arc<dyn ModelClient>> = clients
            .iter()
            .filter(|client| {
                let available = client.is_available();
                if !available {
                    log::debug!(
                        "ConversationOrchestrator::start(...): skipping unavailable client {}",
                        client.model_name()
                    );
                }
                available
            })
            .collect();

        log::info!(
            "Starting conversation {} about {:?}: {} round(s), {} active participant(s)",
            conversation.id(),
            topic,
            rounds,
            active.len()
        );

        self.emit(ConversationEvent::ConversationStart {
            topic: topic.to_string(),
            rounds,
        })
        .await;

        let mut running_context = self.seed_prompt(topic);

        for round in 1..=rounds {
            if self.cancellation.is_cancelled() {
                return Ok(self.cancelled(conversation, round));
            }

            self.emit(ConversationEvent::RoundStart {
                round,
                total_rounds: rounds,
            })
            .await;

            for client in &active {
                if self.cancellation.is_cancelled() {
                    return Ok(self.cancelled(conversation, round));
                }

                let model = client.model_name().to_string();
                self.emit(ConversationEvent::ModelThinking {
                    model: model.clone(),
                    round,
                })
                .await;

                let started = Instant::now();
                let result = tokio::select! {
                    biased;
                    _ = self.cancellation.cancelled() => None,
                    result = client.converse(&running_context) => Some(result),
                };
                let result = match result {
                    Some(result) => result,
                    None => return Ok(self.cancelled(conversation, round)),
                };

                match result {
                    Ok(reply) => {
                        let duration_ms = started.elapsed().as_millis() as u64;
                        log::info!(
                            "{} replied in round {} after {} ms ({} chars)",
                            model,
                            round,
                            duration_ms,
                            reply.len()
                        );

                        self.emit(ConversationEvent::ModelResponse {
                            model: model.clone(),
                            response: reply.clone(),
                            round,
                            avatar: client.avatar().map(str::to_string),
                        })
                        .await;

                        conversation.record_turn(Turn {
                            model,
                            round,
                            message: reply.clone(),
                            duration_ms,
                        });
                        running_context = reply;

                        tokio::select! {
                            biased;
                            _ = self.cancellation.cancelled() => {
                                return Ok(self.cancelled(conversation, round));
                            }
                            _ = self.pacing.pause() => {}
                        }
                    }
                    Err(err) => {
                        log::warn!("{} failed in round {}: {}", model, round, err);
                        self.emit(ConversationEvent::Error {
                            message: format!("Error in round {}: {}", round, err),
                            round: Some(round),
                        })
                        .await;
                    }
                }
            }
        }

        self.emit(ConversationEvent::ConversationEnd {}).await;

        let summary = conversation.finish(ConversationStatus::Completed);
        log::info!(
            "Conversation {} completed: {} response(s), {} ms of model time",
            summary.conversation_id,
            summary.responses.len(),
            summary.total_duration_ms()
        );
        Ok(summary)
    }

    fn cancelled(&self, conversation: Conversation, round: usize) -> ConversationSummary {
        log::info!(
            "Conversation {} cancelled during round {}",
            conversation.id(),
            round
        );
        conversation.finish(ConversationStatus::Cancelled)
    }
}
