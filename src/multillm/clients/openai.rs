//! The `OpenAIClient` struct implements [`ModelClient`] for OpenAI's Chat Completions API.
//!
//! Requests go through the `openai-rust2` SDK on top of the shared pooled HTTP client. Every
//! call sends exactly one `user` message and returns the content of the first choice.
//! Pointing the client at another base URL lets it talk to any OpenAI compatible endpoint.
//!
//! # Example
//!
//! ```rust,no_run
//! use multillm::clients::openai::{Model, OpenAIClient};
//! use multillm::model_client::ModelClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = std::env::var("OPENAI_API_KEY")?;
//!     let client = OpenAIClient::new_with_model_enum(&key, Model::GPT4);
//!     let reply = client.converse("Let's discuss: open source funding").await?;
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use openai_rust::chat;
use openai_rust2 as openai_rust;

use crate::clients::common::get_shared_http_client;
use crate::model_client::{ModelClient, ProviderError};

/// Default REST endpoint for OpenAI.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Request path joined onto the base URL for every chat completion.
pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Model identifiers accepted by the Chat Completions API.
#[allow(non_camel_case_types)]
pub enum Model {
    /// `gpt-4` – the model the discussion demo was tuned against.
    GPT4,
    /// `gpt-4-turbo` – cheaper, larger context GPT-4.
    GPT4Turbo,
    /// `gpt-4o` – Omni model with text + image inputs.
    GPT4o,
    /// `gpt-4o-mini` – cost effective GPT-4o derivative.
    GPT4oMini,
    /// `gpt-4.1` – general availability GPT-4.1.
    GPT41,
    /// `gpt-4.1-mini` – reduced cost GPT-4.1 tier.
    GPT41Mini,
}

/// Convert a [`Model`] variant into the string identifier expected by the REST API.
pub fn model_to_string(model: Model) -> String {
    match model {
        Model::GPT4 => "gpt-4".to_string(),
        Model::GPT4Turbo => "gpt-4-turbo".to_string(),
        Model::GPT4o => "gpt-4o".to_string(),
        Model::GPT4oMini => "gpt-4o-mini".to_string(),
        Model::GPT41 => "gpt-4.1".to_string(),
        Model::GPT41Mini => "gpt-4.1-mini".to_string(),
    }
}

/// Client wrapper for OpenAI's Chat Completions API.
pub struct OpenAIClient {
    /// Underlying SDK client pointing at the REST endpoint.
    client: openai_rust::Client,
    base_url: String,
    model: String,
    display_name: String,
    has_key: bool,
}

impl OpenAIClient {
    /// Construct a new client using the provided API key and [`Model`] variant.
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_string(secret_key, &model_to_string(model))
    }

    /// Construct a new client using the provided API key and explicit model name.
    pub fn new_with_model_string(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(secret_key, model_name, DEFAULT_BASE_URL)
    }

    /// Construct a client targeting a custom OpenAI compatible base URL.
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        let secret_key = secret_key.trim();
        OpenAIClient {
            client: openai_rust::Client::new_with_client_and_base_url(
                secret_key,
                get_shared_http_client().clone(),
                base_url,
            ),
            base_url: base_url.to_string(),
            model: model_name.to_string(),
            display_name: "OpenAI GPT-4".to_string(),
            has_key: !secret_key.is_empty(),
        }
    }

    /// Override the name shown to observers (builder pattern).
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Endpoint the SDK client was built for.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Take the reply out of the choices of a chat completion.
///
/// An empty choice list is a malformed response, not a panic.
pub fn first_choice<I>(contents: I) -> Result<String, ProviderError>
where
    I: IntoIterator<Item = String>,
{
    contents
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("empty `choices` array".into()))
}

#[async_trait]
impl ModelClient for OpenAIClient {
    fn model_name(&self) -> &str {
        &self.display_name
    }

    fn is_available(&self) -> bool {
        self.has_key
    }

    fn avatar(&self) -> Option<&str> {
        Some("🤖")
    }

    async fn converse(&self, prompt: &str) -> Result<String, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::MissingCredentials("OpenAI".into()));
        }

        log::debug!("OpenAIClient::converse(...): calling {}", self.model);
        let chat_arguments = chat::ChatArguments::new(
            &self.model,
            vec![chat::Message {
                role: "user".to_owned(),
                content: prompt.to_string(),
            }],
        );

        let response = self
            .client
            .create_chat(chat_arguments, Some(CHAT_COMPLETIONS_PATH.to_string()))
            .await
            .map_err(|err| {
                log::error!(
                    "OpenAIClient::converse(...): OpenAI API Error: {}",
                    err
                );
                ProviderError::Api(err.to_string())
            })?;

        first_choice(
            response
                .choices
                .into_iter()
                .map(|choice| choice.message.content),
        )
    }
}
