//! In-memory record of a single discussion run.
//!
//! A [`Conversation`] lives exactly as long as one
//! [`ConversationOrchestrator::start`](crate::orchestrator::ConversationOrchestrator::start)
//! call and is turned into a [`ConversationSummary`] when the run ends. Nothing is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static CONVERSATION_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Opaque, process-unique conversation identifier (`conv_<unix millis>_<sequence>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Generate a fresh identifier.
    ///
    /// The millisecond timestamp keeps ids readable; the sequence number keeps them unique
    /// when several runs start within the same millisecond.
    ///
    /// ```
    /// use multillm::conversation::ConversationId;
    ///
    /// let a = ConversationId::generate();
    /// let b = ConversationId::generate();
    /// assert_ne!(a, b);
    /// assert!(a.as_str().starts_with("conv_"));
    /// ```
    pub fn generate() -> Self {
        let seq = CONVERSATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        ConversationId(format!("conv_{}_{}", Utc::now().timestamp_millis(), seq))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Running,
    Completed,
    /// Stopped early because the run's cancellation token fired.
    Cancelled,
}

/// One participant's successful contribution in one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// Display name of the participant.
    pub model: String,
    /// 1-based round number.
    pub round: usize,
    /// Reply text.
    pub message: String,
    /// Wall-clock time spent waiting for the reply.
    pub duration_ms: u64,
}

/// Mutable state owned by one orchestrator run.
#[derive(Debug)]
pub struct Conversation {
    id: ConversationId,
    topic: String,
    planned_rounds: usize,
    responses: Vec<Turn>,
    status: ConversationStatus,
    started_at: DateTime<Utc>,
}

impl Conversation {
    /// Open a new run in the `Running` state.
    pub fn new(topic: impl Into<String>, planned_rounds: usize) -> Self {
        Conversation {
            id: ConversationId::generate(),
            topic: topic.into(),
            planned_rounds,
            responses: Vec::new(),
            status: ConversationStatus::Running,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn planned_rounds(&self) -> usize {
        self.planned_rounds
    }

    pub fn responses(&self) -> &[Turn] {
        &self.responses
    }

    pub fn status(&self) -> ConversationStatus {
        self.status
    }

    /// Append a successful turn. Turns outside `1..=planned_rounds` are refused.
    pub(crate) fn record_turn(&mut self, turn: Turn) -> bool {
        if turn.round == 0 || turn.round > self.planned_rounds {
            log::error!(
                "Conversation::record_turn(...): round {} outside 1..={} for {}",
                turn.round,
                self.planned_rounds,
                self.id
            );
            return false;
        }
        self.responses.push(turn);
        true
    }

    /// Close the run and produce its summary.
    pub(crate) fn finish(mut self, status: ConversationStatus) -> ConversationSummary {
        self.status = status;
        ConversationSummary {
            conversation_id: self.id,
            topic: self.topic,
            rounds: self.planned_rounds,
            responses: self.responses,
            status: self.status,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Result of a run: every successful turn in round-then-participant order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub topic: String,
    /// Planned round count.
    pub rounds: usize,
    pub responses: Vec<Turn>,
    pub status: ConversationStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ConversationSummary {
    /// Sum of the per-turn model latencies.
    pub fn total_duration_ms(&self) -> u64 {
        self.responses.iter().map(|turn| turn.duration_ms).sum()
    }

    /// Turns produced in `round`.
    pub fn turns_in_round(&self, round: usize) -> impl Iterator<Item = &Turn> {
        self.responses.iter().filter(move |turn| turn.round == round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(round: usize, duration_ms: u64) -> Turn {
        Turn {
            model: "A".into(),
            round,
            message: format!("r{}", round),
            duration_ms,
        }
    }

    #[test]
    fn test_ids_are_unique_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..100)
                        .map(|_| ConversationId::generate())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id));
            }
        }
        assert_eq!(ids.len(), 800);
    }

    #[test]
    fn test_record_turn_rejects_out_of_range_rounds() {
        let mut conversation = Conversation::new("topic", 2);
        assert!(!conversation.record_turn(turn(0, 1)));
        assert!(!conversation.record_turn(turn(3, 1)));
        assert!(conversation.record_turn(turn(2, 1)));
        assert_eq!(conversation.responses().len(), 1);
    }

    #[test]
    fn test_finish_builds_summary() {
        let mut conversation = Conversation::new("topic", 2);
        let id = conversation.id().clone();
        assert_eq!(conversation.status(), ConversationStatus::Running);
        conversation.record_turn(turn(1, 120));
        conversation.record_turn(turn(2, 30));

        let summary = conversation.finish(ConversationStatus::Completed);
        assert_eq!(summary.conversation_id, id);
        assert_eq!(summary.status, ConversationStatus::Completed);
        assert_eq!(summary.total_duration_ms(), 150);
        assert_eq!(summary.turns_in_round(2).count(), 1);
        assert!(summary.finished_at >= summary.started_at);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = Conversation::new("t", 1).finish(ConversationStatus::Completed);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["conversationId"].as_str().unwrap().starts_with("conv_"));
        assert_eq!(json["status"], "completed");
    }
}
