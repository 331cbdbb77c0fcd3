//! Startup configuration.
//!
//! [`MultiLlmConfig`] is built once when the process starts, either by hand or from the
//! environment, and then turned into the ordered participant list with
//! [`MultiLlmConfig::build_clients`]. Nothing reads the environment after that point.
//!
//! # Example
//!
//! ```rust
//! use multillm::MultiLlmConfig;
//!
//! let config = MultiLlmConfig {
//!     openai_api_key: Some("sk-test".into()),
//!     ..MultiLlmConfig::default()
//! };
//! let clients = config.build_clients();
//! assert_eq!(clients.len(), 2);
//! assert!(clients[0].is_available());
//! assert!(!clients[1].is_available());
//! ```

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::clients::claude::{self, ClaudeClient};
use crate::clients::openai::{self, OpenAIClient};
use crate::model_client::ModelClient;
use crate::orchestrator::DEFAULT_SEED_TEMPLATE;

/// Global configuration for the discussion service.
#[derive(Debug, Clone)]
pub struct MultiLlmConfig {
    /// `OPENAI_API_KEY`. `None` leaves the OpenAI participant unavailable.
    pub openai_api_key: Option<String>,
    /// `OPENAI_MODEL`.
    pub openai_model: String,
    /// `OPENAI_BASE_URL`.
    pub openai_base_url: String,
    /// `ANTHROPIC_API_KEY`. `None` leaves the Claude participant unavailable.
    pub anthropic_api_key: Option<String>,
    /// `ANTHROPIC_MODEL`.
    pub anthropic_model: String,
    /// `ANTHROPIC_BASE_URL`.
    pub anthropic_base_url: String,
    /// `ANTHROPIC_MAX_TOKENS`.
    pub anthropic_max_tokens: u32,
    /// `HOST`.
    pub host: String,
    /// `PORT`.
    pub port: u16,
    /// `MULTILLM_PACING_MS`: pause after each successful reply.
    pub pacing: Duration,
    /// `MULTILLM_MAX_ROUNDS`: upper bound enforced by the HTTP surface.
    pub max_rounds: usize,
    /// `MULTILLM_SEED_TEMPLATE`: first prompt, `{topic}` is substituted.
    pub seed_template: String,
}

impl Default for MultiLlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: "gpt-4".to_string(),
            openai_base_url: openai::DEFAULT_BASE_URL.to_string(),
            anthropic_api_key: None,
            anthropic_model: "claude-3-sonnet-20240229".to_string(),
            anthropic_base_url: claude::DEFAULT_BASE_URL.to_string(),
            anthropic_max_tokens: claude::DEFAULT_MAX_TOKENS,
            host: "localhost".to_string(),
            port: 3009,
            pacing: Duration::from_millis(1000),
            max_rounds: 10,
            seed_template: DEFAULT_SEED_TEMPLATE.to_string(),
        }
    }
}

impl MultiLlmConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup. Unset or unparsable values keep
    /// their defaults; blank API keys count as missing.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(default)
        };
        let secret = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let config = Self {
            openai_api_key: secret("OPENAI_API_KEY"),
            openai_model: text("OPENAI_MODEL", defaults.openai_model),
            openai_base_url: text("OPENAI_BASE_URL", defaults.openai_base_url),
            anthropic_api_key: secret("ANTHROPIC_API_KEY"),
            anthropic_model: text("ANTHROPIC_MODEL", defaults.anthropic_model),
            anthropic_base_url: text("ANTHROPIC_BASE_URL", defaults.anthropic_base_url),
            anthropic_max_tokens: parse_or(
                &lookup,
                "ANTHROPIC_MAX_TOKENS",
                defaults.anthropic_max_tokens,
            ),
            host: text("HOST", defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            pacing: Duration::from_millis(parse_or(
                &lookup,
                "MULTILLM_PACING_MS",
                defaults.pacing.as_millis() as u64,
            )),
            max_rounds: parse_or(&lookup, "MULTILLM_MAX_ROUNDS", defaults.max_rounds).max(1),
            seed_template: text("MULTILLM_SEED_TEMPLATE", defaults.seed_template),
        };

        log::info!(
            "OPENAI_API_KEY: {}, ANTHROPIC_API_KEY: {}",
            if config.openai_api_key.is_some() { "SET" } else { "NOT SET" },
            if config.anthropic_api_key.is_some() { "SET" } else { "NOT SET" }
        );
        config
    }

    /// Build the ordered participant list: OpenAI first, then Claude.
    ///
    /// A participant without credentials is still returned, reporting
    /// `is_available() == false`, so the orchestrator can skip it silently.
    pub fn build_clients(&self) -> Vec<Arc<dyn ModelClient>> {
        let openai = OpenAIClient::new_with_base_url(
            self.openai_api_key.as_deref().unwrap_or(""),
            &self.openai_model,
            &self.openai_base_url,
        );
        let claude = ClaudeClient::new_with_base_url(
            self.anthropic_api_key.as_deref().unwrap_or(""),
            &self.anthropic_model,
            &self.anthropic_base_url,
        )
        .with_max_tokens(self.anthropic_max_tokens);

        if openai.is_available() {
            log::info!("OpenAI client initialized ({})", openai.model());
        } else {
            log::warn!("OpenAI API key not found");
        }
        if claude.is_available() {
            log::info!("Anthropic client initialized ({})", claude.model());
        } else {
            log::warn!("Anthropic API key not found");
        }

        let clients: Vec<Arc<dyn ModelClient>> = vec![Arc::new(openai), Arc::new(claude)];
        clients
    }

    /// `host:port` for the HTTP surface.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring unparsable {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}
