//! Transport helpers shared by the provider adapters.

use crate::model_client::ProviderError;
use lazy_static::lazy_static;
use serde_json::Value;
use std::time::Duration;

lazy_static! {
    /// Pooled HTTP client reused by every provider adapter.
    static ref SHARED_HTTP_CLIENT: reqwest::Client = reqwest::ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(300))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());
}

/// Get the process wide pooled HTTP client.
///
/// Connections, DNS lookups and TLS sessions are reused across providers and across
/// concurrent conversations.
pub fn get_shared_http_client() -> &'static reqwest::Client {
    &SHARED_HTTP_CLIENT
}

/// Send a prepared request and decode the JSON body, mapping every failure onto
/// [`ProviderError`].
pub async fn send_json(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<Value, ProviderError> {
    let response = request.send().await.map_err(|err| {
        log::error!(
            "multillm::clients::common::send_json(...): {} transport error: {}",
            provider,
            err
        );
        ProviderError::Transport(err.to_string())
    })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| ProviderError::Transport(err.to_string()))?;

    if !status.is_success() {
        log::error!(
            "multillm::clients::common::send_json(...): {} API error {}: {}",
            provider,
            status.as_u16(),
            body
        );
        return Err(ProviderError::Rejected {
            status: status.as_u16(),
            message: extract_error_message(&body),
        });
    }

    serde_json::from_str(&body).map_err(|err| {
        ProviderError::MalformedResponse(format!("{} returned invalid JSON: {}", provider, err))
    })
}

/// Pull `error.message` out of a provider error body, falling back to the raw body.
///
/// Both OpenAI and Anthropic nest the human readable message under `error.message`.
pub fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message_from_nested_error() {
        let body = r#"{"error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        assert_eq!(extract_error_message(body), "invalid x-api-key");
    }

    #[test]
    fn test_extract_error_message_falls_back_to_body() {
        assert_eq!(extract_error_message("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(extract_error_message(r#"{"detail":"nope"}"#), r#"{"detail":"nope"}"#);
    }

    #[test]
    fn test_shared_client_is_reused() {
        let first = get_shared_http_client() as *const reqwest::Client;
        let second = get_shared_http_client() as *const reqwest::Client;
        assert_eq!(first, second);
    }
}
