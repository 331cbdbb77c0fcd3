//! Browser facing discussion server.
//!
//! Reads its configuration from the environment (see [`multillm::MultiLlmConfig`]), then
//! serves the HTTP control surface until Ctrl-C.

use multillm::broadcast::BroadcastHub;
use multillm::{web_server, MultiLlmConfig};
use std::error::Error;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    multillm::init_logger();

    let config = MultiLlmConfig::from_env();
    let clients = config.build_clients();
    if clients.iter().all(|client| !client.is_available()) {
        log::warn!("No provider API keys configured, conversations will produce no responses");
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutting down server...");
            signal.cancel();
        }
    });

    web_server::serve(&config, clients, BroadcastHub::default(), shutdown).await
}
