use async_trait::async_trait;
use multillm::conversation::ConversationStatus;
use multillm::event::{ConversationEvent, EventSink};
use multillm::model_client::{ModelClient, ProviderError};
use multillm::orchestrator::{ConversationError, ConversationOrchestrator};
use multillm::pacing::Pacing;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ConversationEvent>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<ConversationEvent> {
        self.events.lock().unwrap().clone()
    }

    fn types(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.event_type()).collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: &ConversationEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Replies with a fixed string (or fails) and remembers every prompt it was given.
struct MockClient {
    name: String,
    response: Result<String, ProviderError>,
    available: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockClient {
    fn replying(name: &str, response: &str) -> Arc<Self> {
        Arc::new(MockClient {
            name: name.to_string(),
            response: Ok(response.to_string()),
            available: true,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(name: &str) -> Arc<Self> {
        Arc::new(MockClient {
            name: name.to_string(),
            response: Err(ProviderError::Rejected {
                status: 500,
                message: "upstream exploded".to_string(),
            }),
            available: true,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn unavailable(name: &str) -> Arc<Self> {
        Arc::new(MockClient {
            name: name.to_string(),
            response: Ok("should never be called".to_string()),
            available: false,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for MockClient {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn converse(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.response.clone()
    }
}

fn as_clients(clients: &[Arc<MockClient>]) -> Vec<Arc<dyn ModelClient>> {
    clients
        .iter()
        .map(|c| c.clone() as Arc<dyn ModelClient>)
        .collect()
}

fn orchestrator_with_sink() -> (ConversationOrchestrator, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    (ConversationOrchestrator::new(sink.clone()), sink)
}

#[tokio::test]
async fn test_two_round_discussion_emits_exact_sequence() {
    let (orchestrator, sink) = orchestrator_with_sink();
    let a = MockClient::replying("A", "r1");
    let b = MockClient::replying("B", "r2");

    let summary = orchestrator
        .start("AI ethics", 2, &as_clients(&[a, b]))
        .await
        .unwrap();

    let mut expected = vec![ConversationEvent::ConversationStart {
        topic: "AI ethics".to_string(),
        rounds: 2,
    }];
    for round in 1..=2 {
        expected.push(ConversationEvent::RoundStart {
            round,
            total_rounds: 2,
        });
        for (model, response) in &[("A", "r1"), ("B", "r2")] {
            expected.push(ConversationEvent::ModelThinking {
                model: model.to_string(),
                round,
            });
            expected.push(ConversationEvent::ModelResponse {
                model: model.to_string(),
                response: response.to_string(),
                round,
                avatar: None,
            });
        }
    }
    expected.push(ConversationEvent::ConversationEnd {});

    assert_eq!(sink.events(), expected);
    assert_eq!(summary.responses.len(), 4);
    assert_eq!(summary.topic, "AI ethics");
    assert_eq!(summary.rounds, 2);
    assert_eq!(summary.status, ConversationStatus::Completed);
    let order: Vec<(usize, &str)> = summary
        .responses
        .iter()
        .map(|t| (t.round, t.model.as_str()))
        .collect();
    assert_eq!(order, vec![(1, "A"), (1, "B"), (2, "A"), (2, "B")]);
}

#[tokio::test]
async fn test_round_starts_are_counted_and_increasing() {
    let (orchestrator, sink) = orchestrator_with_sink();
    let clients = as_clients(&[MockClient::replying("A", "x")]);

    orchestrator.start("topic", 5, &clients).await.unwrap();

    let rounds: Vec<usize> = sink
        .events()
        .iter()
        .filter_map(|e| match e {
            ConversationEvent::RoundStart {
                round,
                total_rounds,
            } => {
                assert_eq!(*total_rounds, 5);
                Some(*round)
            }
            _ => None,
        })
        .collect();
    assert_eq!(rounds, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_start_and_end_bracket_the_run() {
    let (orchestrator, sink) = orchestrator_with_sink();
    let clients = as_clients(&[MockClient::replying("A", "x"), MockClient::failing("B")]);

    orchestrator.start("topic", 3, &clients).await.unwrap();

    let types = sink.types();
    assert_eq!(types.first(), Some(&"conversation_start"));
    assert_eq!(types.last(), Some(&"conversation_end"));
    assert_eq!(types.iter().filter(|t| **t == "conversation_start").count(), 1);
    assert_eq!(types.iter().filter(|t| **t == "conversation_end").count(), 1);
    assert_eq!(types[1], "round_start");
}

#[tokio::test]
async fn test_always_failing_client_still_completes() {
    let (orchestrator, sink) = orchestrator_with_sink();
    let a = MockClient::failing("A");
    let b = MockClient::failing("B");

    let summary = orchestrator
        .start("topic", 3, &as_clients(&[a.clone(), b]))
        .await
        .unwrap();

    assert!(summary.responses.is_empty());
    assert_eq!(summary.status, ConversationStatus::Completed);

    let errors: Vec<ConversationEvent> = sink
        .events()
        .into_iter()
        .filter(|e| e.event_type() == "error")
        .collect();
    assert_eq!(errors.len(), 6);
    assert_eq!(
        errors[0],
        ConversationEvent::Error {
            message: "Error in round 1: Provider rejected the request (500): upstream exploded"
                .to_string(),
            round: Some(1),
        }
    );
    assert_eq!(sink.types().last(), Some(&"conversation_end"));

    // no success ever happened, so every call saw the seed prompt
    assert!(a.prompts().iter().all(|p| p == "Let's discuss: topic"));
}

#[tokio::test]
async fn test_second_client_receives_first_reply() {
    let (orchestrator, _sink) = orchestrator_with_sink();
    let a = MockClient::replying("A", "X");
    let b = MockClient::replying("B", "Y");

    orchestrator
        .start("topic", 2, &as_clients(&[a.clone(), b.clone()]))
        .await
        .unwrap();

    assert_eq!(a.prompts(), vec!["Let's discuss: topic", "Y"]);
    assert_eq!(b.prompts(), vec!["X", "X"]);
}

#[tokio::test]
async fn test_failure_leaves_running_context_untouched() {
    let (orchestrator, sink) = orchestrator_with_sink();
    let a = MockClient::failing("A");
    let b = MockClient::replying("B", "Z");

    let summary = orchestrator
        .start("topic", 2, &as_clients(&[a.clone(), b.clone()]))
        .await
        .unwrap();

    assert_eq!(b.prompts()[0], "Let's discuss: topic");
    assert_eq!(a.prompts()[1], "Z");
    assert_eq!(summary.responses.len(), 2);
    assert!(summary.responses.iter().all(|t| t.model == "B"));

    // the error event sits between A's thinking and B's thinking
    let types = sink.types();
    assert_eq!(
        &types[..6],
        &[
            "conversation_start",
            "round_start",
            "model_thinking",
            "error",
            "model_thinking",
            "model_response"
        ]
    );
}

#[tokio::test]
async fn test_no_clients_is_a_valid_run() {
    let (orchestrator, sink) = orchestrator_with_sink();

    let summary = orchestrator.start("", 1, &[]).await.unwrap();

    assert_eq!(
        sink.events(),
        vec![
            ConversationEvent::ConversationStart {
                topic: String::new(),
                rounds: 1
            },
            ConversationEvent::RoundStart {
                round: 1,
                total_rounds: 1
            },
            ConversationEvent::ConversationEnd {},
        ]
    );
    assert!(summary.responses.is_empty());
}

#[tokio::test]
async fn test_zero_rounds_is_rejected_before_any_event() {
    let (orchestrator, sink) = orchestrator_with_sink();
    let a = MockClient::replying("A", "x");

    let err = orchestrator
        .start("x", 0, &as_clients(&[a.clone()]))
        .await
        .unwrap_err();

    assert!(matches!(err, ConversationError::InvalidArgument(_)));
    assert!(sink.events().is_empty());
    assert!(a.prompts().is_empty());
}

#[tokio::test]
async fn test_unavailable_clients_are_skipped_silently() {
    let (orchestrator, sink) = orchestrator_with_sink();
    let missing = MockClient::unavailable("Missing");
    let a = MockClient::replying("A", "x");

    let summary = orchestrator
        .start("topic", 2, &as_clients(&[missing.clone(), a]))
        .await
        .unwrap();

    assert!(missing.prompts().is_empty());
    assert_eq!(summary.responses.len(), 2);
    assert!(sink.events().iter().all(|e| match e {
        ConversationEvent::ModelThinking { model, .. } => model == "A",
        ConversationEvent::Error { .. } => false,
        _ => true,
    }));
}

#[tokio::test]
async fn test_custom_seed_template() {
    let sink = Arc::new(RecordingSink::default());
    let orchestrator =
        ConversationOrchestrator::new(sink).with_seed_template("Debate the motion: {topic}!");
    let a = MockClient::replying("A", "x");

    orchestrator
        .start("tabs vs spaces", 1, &as_clients(&[a.clone()]))
        .await
        .unwrap();

    assert_eq!(a.prompts(), vec!["Debate the motion: tabs vs spaces!"]);
}

#[tokio::test]
async fn test_avatar_is_forwarded() {
    struct WithAvatar;

    #[async_trait]
    impl ModelClient for WithAvatar {
        fn model_name(&self) -> &str {
            "Avatar"
        }
        fn avatar(&self) -> Option<&str> {
            Some("🤖")
        }
        async fn converse(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok("hi".to_string())
        }
    }

    let (orchestrator, sink) = orchestrator_with_sink();
    let clients: Vec<Arc<dyn ModelClient>> = vec![Arc::new(WithAvatar)];
    orchestrator.start("t", 1, &clients).await.unwrap();

    assert!(sink.events().contains(&ConversationEvent::ModelResponse {
        model: "Avatar".to_string(),
        response: "hi".to_string(),
        round: 1,
        avatar: Some("🤖".to_string()),
    }));
}

#[derive(Default)]
struct CountingPacing {
    pauses: AtomicUsize,
}

#[async_trait]
impl Pacing for CountingPacing {
    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_pacing_follows_successful_calls_only() {
    let pacing = Arc::new(CountingPacing::default());
    let orchestrator = ConversationOrchestrator::new(Arc::new(RecordingSink::default()))
        .with_pacing(pacing.clone());
    let clients = as_clients(&[MockClient::replying("A", "x"), MockClient::failing("B")]);

    orchestrator.start("t", 3, &clients).await.unwrap();

    assert_eq!(pacing.pauses.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_cancellation_stops_calls_and_events() {
    struct Hanging;

    #[async_trait]
    impl ModelClient for Hanging {
        fn model_name(&self) -> &str {
            "Hanging"
        }
        async fn converse(&self, _prompt: &str) -> Result<String, ProviderError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    let sink = Arc::new(RecordingSink::default());
    let token = CancellationToken::new();
    let orchestrator = ConversationOrchestrator::new(sink.clone()).with_cancellation(token.clone());
    let after = MockClient::replying("After", "x");
    let clients: Vec<Arc<dyn ModelClient>> = vec![Arc::new(Hanging), after.clone()];

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.start("t", 3, &clients),
    )
    .await
    .expect("cancelled run must return promptly")
    .unwrap();
    canceller.await.unwrap();

    assert_eq!(summary.status, ConversationStatus::Cancelled);
    assert!(summary.responses.is_empty());
    assert!(after.prompts().is_empty());
    assert_eq!(
        sink.types(),
        vec!["conversation_start", "round_start", "model_thinking"]
    );
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    struct Echo;

    #[async_trait]
    impl ModelClient for Echo {
        fn model_name(&self) -> &str {
            "Echo"
        }
        async fn converse(&self, prompt: &str) -> Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(format!("{}+", prompt))
        }
    }

    let clients: Vec<Arc<dyn ModelClient>> = vec![Arc::new(Echo)];
    let (first, first_sink) = orchestrator_with_sink();
    let (second, second_sink) = orchestrator_with_sink();

    let (a, b) = tokio::join!(
        first.start("cats", 3, &clients),
        second.start("dogs", 3, &clients)
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.conversation_id, b.conversation_id);
    assert_eq!(a.responses[2].message, "Let's discuss: cats+++");
    assert_eq!(b.responses[2].message, "Let's discuss: dogs+++");
    assert_eq!(first_sink.events().len(), second_sink.events().len());
}
