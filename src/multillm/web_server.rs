//! HTTP control surface for browser observers.
//!
//! Only available with the `web-server` feature. The router exposes:
//!
//! - `POST /start-conversation` with `{"topic": "...", "rounds": 3}`: validates the input,
//!   runs a discussion against the shared [`BroadcastHub`] and answers with the
//!   conversation id once the run is over. Dropping the request abandons the run.
//! - `GET /events`: Server-Sent Events stream. Each conversation event arrives as
//!   `event: <type>` with its JSON payload as `data`; a `connected` event is sent first and a
//!   `ping` event carrying `{"timestamp": <millis>}` keeps idle connections open.
//! - `GET /health`: readiness summary.
//!
//! ```rust,no_run
//! use multillm::broadcast::BroadcastHub;
//! use multillm::web_server;
//! use multillm::MultiLlmConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = MultiLlmConfig::from_env();
//!     let clients = config.build_clients();
//!     web_server::serve(&config, clients, BroadcastHub::default(), CancellationToken::new()).await
//! }
//! ```

use std::convert::{Infallible, TryFrom};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream, StreamExt};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::broadcast::BroadcastHub;
use crate::config::MultiLlmConfig;
use crate::event::ConversationEvent;
use crate::model_client::ModelClient;
use crate::orchestrator::ConversationOrchestrator;
use crate::pacing::FixedPacing;

/// Default interval between `ping` events on every event stream.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Body of `POST /start-conversation`.
///
/// `rounds` accepts a JSON number or a numeric string (`"3"`); its range is checked by the
/// handler so that out of range values get the same JSON error as every other bad input.
#[derive(Debug, Deserialize)]
pub struct StartConversationRequest {
    pub topic: String,
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub rounds: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    Text(String),
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(value) => Ok(value),
        NumberOrString::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("rounds is not a number: {:?}", text))),
    }
}

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    hub: BroadcastHub,
    clients: Arc<Vec<Arc<dyn ModelClient>>>,
    orchestrator: ConversationOrchestrator,
    max_rounds: usize,
    ping_interval: Duration,
    shutdown: CancellationToken,
}

impl AppState {
    /// Wire the orchestrator to `hub` using the pacing and seed template from `config`.
    pub fn new(
        config: &MultiLlmConfig,
        clients: Vec<Arc<dyn ModelClient>>,
        hub: BroadcastHub,
        shutdown: CancellationToken,
    ) -> Self {
        let orchestrator = ConversationOrchestrator::new(Arc::new(hub.clone()))
            .with_pacing(Arc::new(FixedPacing::new(config.pacing)))
            .with_seed_template(config.seed_template.clone());

        AppState {
            hub,
            clients: Arc::new(clients),
            orchestrator,
            max_rounds: config.max_rounds,
            ping_interval: KEEP_ALIVE_INTERVAL,
            shutdown,
        }
    }

    /// Override how often event streams send a `ping` event (builder pattern).
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// The hub conversation events are broadcast through.
    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }
}

/// Build the axum router for `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/start-conversation", post(start_conversation))
        .route("/events", get(events))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind `config.bind_address()` and serve until `shutdown` is cancelled.
///
/// Runs still in flight when `shutdown` fires are cancelled cooperatively.
pub async fn serve(
    config: &MultiLlmConfig,
    clients: Vec<Arc<dyn ModelClient>>,
    hub: BroadcastHub,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let state = AppState::new(config, clients, hub, shutdown.clone());
    let listener = TcpListener::bind(config.bind_address()).await?;
    log::info!(
        "Web interface running at http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    log::info!("Server closed");
    Ok(())
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "error": message.into()})),
    )
        .into_response()
}

async fn start_conversation(
    State(state): State<AppState>,
    request: Result<Json<StartConversationRequest>, JsonRejection>,
) -> Response {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            log::warn!("Rejected start_conversation body: {}", rejection.body_text());
            return bad_request(rejection.body_text());
        }
    };
    let topic = request.topic.trim().to_string();
    log::info!(
        "Received start_conversation: {:?} with {} rounds",
        topic,
        request.rounds
    );

    if topic.is_empty() {
        return bad_request("topic must not be empty");
    }
    let rounds = match usize::try_from(request.rounds) {
        Ok(rounds) if rounds >= 1 && rounds <= state.max_rounds => rounds,
        _ => {
            return bad_request(format!(
                "rounds must be between 1 and {}",
                state.max_rounds
            ))
        }
    };

    let orchestrator = state
        .orchestrator
        .clone()
        .with_cancellation(state.shutdown.child_token());

    match orchestrator
        .start(&topic, rounds, &state.clients)
        .await
    {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "conversationId": summary.conversation_id,
                "totalResponses": summary.responses.len(),
                "status": summary.status,
            })),
        )
            .into_response(),
        Err(err) => {
            log::error!("Error in start_conversation: {}", err);
            bad_request(err.to_string())
        }
    }
}

fn to_sse_event(event: &ConversationEvent) -> Event {
    Event::default()
        .event(event.event_type())
        .data(event.payload().to_string())
}

async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let observer = state.hub.subscribe();
    log::info!(
        "SSE client connected. Total clients: {}",
        state.hub.observer_count()
    );

    let connected = stream::once(async {
        Ok::<Event, Infallible>(
            Event::default()
                .event("connected")
                .data(r#"{"message":"Connected to SSE"}"#),
        )
    });
    let updates = stream::unfold(observer, |mut observer| async move {
        observer
            .next_event()
            .await
            .map(|event| (Ok::<Event, Infallible>(to_sse_event(&event)), observer))
    });

    let period = state.ping_interval;
    let pings = stream::unfold(
        time::interval_at(Instant::now() + period, period),
        |mut ticker| async move {
            ticker.tick().await;
            Some((Ok::<Event, Infallible>(ping_event()), ticker))
        },
    );

    let shutdown = state.shutdown.clone();
    let stream = connected
        .chain(stream::select(updates, pings))
        .take_until(async move { shutdown.cancelled().await });

    Sse::new(stream)
}

fn ping_event() -> Event {
    Event::default().event("ping").data(
        json!({"timestamp": chrono::Utc::now().timestamp_millis()}).to_string(),
    )
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let available: Vec<&str> = state
        .clients
        .iter()
        .filter(|client| client.is_available())
        .map(|client| client.model_name())
        .collect();

    Json(json!({
        "status": "ok",
        "availableClients": available,
        "observers": state.hub.observer_count(),
    }))
}
