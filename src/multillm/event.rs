//! Conversation lifecycle events and the sink they are emitted into.
//!
//! The orchestrator reports progress through a single [`EventSink`] trait. Events are
//! fire-and-forget: the orchestrator never waits for an acknowledgement and never learns
//! whether anyone was listening.
//!
//! # Event Flow (2 participants, 1 round)
//!
//! ```text
//! ConversationStart { topic, rounds: 1 }
//!   └─ RoundStart { round: 1, total_rounds: 1 }
//!       ├─ ModelThinking { model: "OpenAI GPT-4" }
//!       ├─ ModelResponse { model: "OpenAI GPT-4", response }
//!       ├─ ModelThinking { model: "Anthropic Claude" }
//!       └─ Error { message: "Error in round 1: ..." }
//! ConversationEnd
//! ```
//!
//! # Wire shape
//!
//! Serialized events are adjacently tagged so every observer receives `{type, data}`:
//!
//! ```rust
//! use multillm::event::ConversationEvent;
//!
//! let event = ConversationEvent::RoundStart { round: 2, total_rounds: 3 };
//! let json = serde_json::to_value(&event).unwrap();
//! assert_eq!(json["type"], "round_start");
//! assert_eq!(json["data"]["totalRounds"], 3);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Events emitted by a [`ConversationOrchestrator`](crate::orchestrator::ConversationOrchestrator)
/// during a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// Emitted once, before any round begins.
    ConversationStart {
        /// Topic supplied by the caller.
        topic: String,
        /// Number of rounds planned for the run.
        rounds: usize,
    },

    /// A new round is beginning.
    RoundStart {
        /// 1-based round number.
        round: usize,
        /// Number of rounds planned for the run.
        #[serde(rename = "totalRounds")]
        total_rounds: usize,
    },

    /// A participant has been handed the running prompt and is working on a reply.
    ModelThinking {
        /// Display name of the participant.
        model: String,
        /// 1-based round number.
        round: usize,
    },

    /// A participant replied successfully.
    ModelResponse {
        /// Display name of the participant.
        model: String,
        /// Full reply text.
        response: String,
        /// 1-based round number.
        round: usize,
        /// Optional avatar for the transcript UI.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        avatar: Option<String>,
    },

    /// A participant's call failed. The run continues with the next participant.
    Error {
        /// Human readable description, e.g. `"Error in round 2: ..."`.
        message: String,
        /// Round in which the failure occurred, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        round: Option<usize>,
    },

    /// Emitted once after the last round's events.
    ConversationEnd {},
}

impl ConversationEvent {
    /// The event name observers subscribe to (`"model_response"`, `"conversation_end"`, ...).
    pub fn event_type(&self) -> &'static str {
        match self {
            ConversationEvent::ConversationStart { .. } => "conversation_start",
            ConversationEvent::RoundStart { .. } => "round_start",
            ConversationEvent::ModelThinking { .. } => "model_thinking",
            ConversationEvent::ModelResponse { .. } => "model_response",
            ConversationEvent::Error { .. } => "error",
            ConversationEvent::ConversationEnd {} => "conversation_end",
        }
    }

    /// The `data` half of the wire shape.
    ///
    /// ```rust
    /// use multillm::event::ConversationEvent;
    ///
    /// assert_eq!(ConversationEvent::ConversationEnd {}.payload(), serde_json::json!({}));
    /// ```
    pub fn payload(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove("data").unwrap_or_else(|| json!({})),
            _ => json!({}),
        }
    }

    /// Round the event belongs to, if it is scoped to one.
    pub fn round(&self) -> Option<usize> {
        match self {
            ConversationEvent::RoundStart { round, .. }
            | ConversationEvent::ModelThinking { round, .. }
            | ConversationEvent::ModelResponse { round, .. } => Some(*round),
            ConversationEvent::Error { round, .. } => *round,
            ConversationEvent::ConversationStart { .. } | ConversationEvent::ConversationEnd {} => {
                None
            }
        }
    }
}

/// Destination for [`ConversationEvent`]s.
///
/// Implementations decide how events reach observers (broadcast channel, log, test
/// recorder). `emit` must not fail: delivery problems are the sink's own business and are
/// never surfaced to the orchestrator.
///
/// # Example: Minimal Logger
///
/// ```rust,no_run
/// use multillm::event::{ConversationEvent, EventSink};
/// use async_trait::async_trait;
///
/// struct Logger;
///
/// #[async_trait]
/// impl EventSink for Logger {
///     async fn emit(&self, event: &ConversationEvent) {
///         println!("{} {}", event.event_type(), event.payload());
///     }
/// }
/// ```
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver `event` to whoever is currently observing.
    async fn emit(&self, event: &ConversationEvent);
}

/// Sink that drops every event.
pub struct NoopSink;

#[async_trait]
impl EventSink for NoopSink {
    async fn emit(&self, _event: &ConversationEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_response_omits_missing_avatar() {
        let event = ConversationEvent::ModelResponse {
            model: "A".into(),
            response: "r1".into(),
            round: 1,
            avatar: None,
        };
        assert_eq!(
            event.payload(),
            json!({"model": "A", "response": "r1", "round": 1})
        );
    }

    #[test]
    fn test_error_payload_carries_round() {
        let event = ConversationEvent::Error {
            message: "Error in round 3: boom".into(),
            round: Some(3),
        };
        assert_eq!(event.event_type(), "error");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "error", "data": {"message": "Error in round 3: boom", "round": 3}})
        );
        assert_eq!(event.round(), Some(3));
    }

    #[test]
    fn test_event_type_matches_serialized_tag() {
        let events = vec![
            ConversationEvent::ConversationStart {
                topic: "t".into(),
                rounds: 1,
            },
            ConversationEvent::RoundStart {
                round: 1,
                total_rounds: 1,
            },
            ConversationEvent::ModelThinking {
                model: "A".into(),
                round: 1,
            },
            ConversationEvent::ConversationEnd {},
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.event_type());
        }
    }

    #[test]
    fn test_deserializes_from_wire_shape() {
        let raw = r#"{"type":"model_thinking","data":{"model":"Anthropic Claude","round":2}}"#;
        let event: ConversationEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(
            event,
            ConversationEvent::ModelThinking {
                model: "Anthropic Claude".into(),
                round: 2
            }
        );
    }
}
