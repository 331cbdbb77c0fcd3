//! Anthropic Claude client speaking the native Messages API.
//!
//! # Example
//!
//! ```rust,no_run
//! use multillm::clients::claude::{ClaudeClient, Model};
//! use multillm::model_client::ModelClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = std::env::var("ANTHROPIC_API_KEY")?;
//!     let client = ClaudeClient::new_with_model_enum(&key, Model::Claude3Sonnet);
//!     println!("{}", client.converse("List three Claude capabilities.").await?);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::clients::common::{get_shared_http_client, send_json};
use crate::model_client::{ModelClient, ProviderError};

/// Default REST endpoint for Anthropic.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// API version header value sent with every request.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default completion budget per reply.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Claude models available through the Messages API.
pub enum Model {
    /// `claude-3-sonnet-20240229` – balanced reasoning and throughput.
    Claude3Sonnet,
    /// `claude-3-opus-20240229` – most capable Claude 3 tier.
    Claude3Opus,
    /// `claude-3-haiku-20240307` – fastest Claude 3 tier.
    Claude3Haiku,
    /// `claude-3-5-sonnet-latest` – latest 3.5 Sonnet iteration.
    Claude35Sonnet,
    /// `claude-sonnet-4-0` – Sonnet 4.
    ClaudeSonnet4,
}

fn model_to_string(model: Model) -> String {
    match model {
        Model::Claude3Sonnet => "claude-3-sonnet-20240229".to_string(),
        Model::Claude3Opus => "claude-3-opus-20240229".to_string(),
        Model::Claude3Haiku => "claude-3-haiku-20240307".to_string(),
        Model::Claude35Sonnet => "claude-3-5-sonnet-latest".to_string(),
        Model::ClaudeSonnet4 => "claude-sonnet-4-0".to_string(),
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<UserMessage<'a>>,
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Client wrapper for Anthropic's Messages API.
pub struct ClaudeClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    display_name: String,
}

impl ClaudeClient {
    /// Create a client from an API key and strongly typed model variant.
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_str(secret_key, &model_to_string(model))
    }

    /// Create a client from an API key and explicit model string.
    pub fn new_with_model_str(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(secret_key, model_name, DEFAULT_BASE_URL)
    }

    /// Create a client pointing at a custom Claude-compatible base URL.
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        ClaudeClient {
            http: get_shared_http_client().clone(),
            secret_key: secret_key.trim().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model_name.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            display_name: "Anthropic Claude".to_string(),
        }
    }

    /// Override the per-reply completion budget (builder pattern).
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
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
}

/// Join the `text` blocks of a Messages API response.
pub fn parse_messages_response(body: &Value) -> Result<String, ProviderError> {
    let blocks = body
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::MalformedResponse("missing `content` array".into()))?;

    let texts: Vec<&str> = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();

    if texts.is_empty() {
        return Err(ProviderError::MalformedResponse(
            "response contained no text blocks".into(),
        ));
    }
    Ok(texts.concat())
}

#[async_trait]
impl ModelClient for ClaudeClient {
    fn model_name(&self) -> &str {
        &self.display_name
    }

    fn is_available(&self) -> bool {
        !self.secret_key.is_empty()
    }

    fn avatar(&self) -> Option<&str> {
        Some("🧠")
    }

    async fn converse(&self, prompt: &str) -> Result<String, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::MissingCredentials("Anthropic".into()));
        }

        log::debug!("ClaudeClient::converse(...): calling {}", self.model);
        let request = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.secret_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&MessagesRequest {
                model: &self.model,
                max_tokens: self.max_tokens,
                messages: vec![UserMessage {
                    role: "user",
                    content: prompt,
                }],
            });

        let body = send_json("Anthropic", request).await?;
        parse_messages_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_messages_response_joins_text_blocks() {
        let body = json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Ethics "},
                {"type": "tool_use", "id": "t1", "name": "noop", "input": {}},
                {"type": "text", "text": "matters."}
            ]
        });
        assert_eq!(parse_messages_response(&body).unwrap(), "Ethics matters.");
    }

    #[test]
    fn test_parse_messages_response_rejects_empty_content() {
        assert!(parse_messages_response(&json!({"content": []})).is_err());
        assert!(parse_messages_response(&json!({"id": "msg_1"})).is_err());
    }

    #[test]
    fn test_defaults() {
        let client = ClaudeClient::new_with_model_enum("sk-ant", Model::Claude3Sonnet);
        assert!(client.is_available());
        assert_eq!(client.model(), "claude-3-sonnet-20240229");
        assert_eq!(client.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(client.avatar(), Some("🧠"));
    }

    #[tokio::test]
    async fn test_converse_without_key_fails_fast() {
        let client = ClaudeClient::new_with_model_str("", "claude-3-haiku-20240307");
        let err = client.converse("hi").await.unwrap_err();
        assert_eq!(err, ProviderError::MissingCredentials("Anthropic".into()));
    }
}
