//! The capability every participant in a discussion exposes.
//!
//! A [`ModelClient`] wraps one remote model provider behind a single operation,
//! [`converse`](ModelClient::converse): a prompt goes in, a reply comes out. Clients carry
//! no conversation memory of their own; the orchestrator threads the running prompt between
//! calls, so a client can be shared across any number of concurrent conversations.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use multillm::model_client::{ModelClient, ProviderError};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl ModelClient for Echo {
//!     fn model_name(&self) -> &str {
//!         "Echo"
//!     }
//!
//!     async fn converse(&self, prompt: &str) -> Result<String, ProviderError> {
//!         Ok(prompt.to_string())
//!     }
//! }
//! ```

use async_trait::async_trait;
use std::error::Error;
use std::fmt;

/// Failure of a single model call.
///
/// The orchestrator treats every variant the same way: the failure is reported to observers
/// and the discussion moves on to the next participant.
///
/// ```
/// use multillm::model_client::ProviderError;
///
/// let err = ProviderError::Rejected { status: 401, message: "invalid x-api-key".into() };
/// assert_eq!(err.to_string(), "Provider rejected the request (401): invalid x-api-key");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The client was built without an API key.
    MissingCredentials(String),
    /// The request never produced an HTTP response (DNS, TLS, timeout, connection reset).
    Transport(String),
    /// The provider answered 2xx but the body did not contain a reply.
    MalformedResponse(String),
    /// The provider SDK reported a failed call; the message is the SDK's own description.
    Api(String),
    /// The provider answered with an error status.
    Rejected {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Provider supplied error message, or the raw body when none could be extracted.
        message: String,
    },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::MissingCredentials(provider) => write!(
                f,
                "{} client not initialized. Please check your API key.",
                provider
            ),
            ProviderError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ProviderError::Api(msg) => write!(f, "API error: {}", msg),
            ProviderError::MalformedResponse(msg) => {
                write!(f, "Malformed provider response: {}", msg)
            }
            ProviderError::Rejected { status, message } => write!(
                f,
                "Provider rejected the request ({}): {}",
                status, message
            ),
        }
    }
}

impl Error for ProviderError {}

/// Trait implemented by every model provider adapter.
///
/// Implementations must be cheap to share (`Send + Sync`) and must not mutate local state in
/// [`converse`](ModelClient::converse).
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Display name used in events and transcripts (e.g. `"OpenAI GPT-4"`).
    fn model_name(&self) -> &str;

    /// Whether the client was configured with credentials.
    ///
    /// Unavailable clients are skipped by the orchestrator without reporting an error.
    fn is_available(&self) -> bool {
        true
    }

    /// Optional avatar forwarded with `model_response` events.
    fn avatar(&self) -> Option<&str> {
        None
    }

    /// Send `prompt` as the only user message of a fresh request and return the reply text.
    async fn converse(&self, prompt: &str) -> Result<String, ProviderError>;
}
