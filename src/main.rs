//! Chat relay - Telegram front end for a chat-completion API
//!
//! Long-polls the Bot API, keeps a per-user history in a JSON store and
//! relays each message through a linear exchange state machine.

mod attachment;
mod bot;
mod chunk;
mod code_index;
mod config;
mod llm;
mod render;
mod runtime;
mod state_machine;
mod store;
mod telegram;
mod transport;

use bot::Dispatcher;
use config::RelayConfig;
use llm::{CompletionService, LlmService, LoggingService};
use runtime::{ConversationRuntime, ProductionRuntime, ServiceLlmClient};
use std::sync::Arc;
use std::time::Duration;
use store::JsonProfileStore;
use telegram::TelegramTransport;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

type ProductionDispatcher =
    Dispatcher<JsonProfileStore, ServiceLlmClient, Arc<TelegramTransport>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = RelayConfig::from_env()?;

    // Ensure store directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let store = JsonProfileStore::open(&config.db_path, config.default_model.clone())?;
    tracing::info!(path = %store.path().display(), "Profile store ready");

    let completion = CompletionService::new(
        config.completion_api_url.clone(),
        config.completion_api_key.clone(),
        config.completion_timeout,
    )?;
    let service: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(completion)));
    tracing::info!(
        endpoint = %service.endpoint(),
        default_model = %config.default_model,
        "Completion API configured"
    );

    let transport = Arc::new(TelegramTransport::new(
        config.telegram_api_base.clone(),
        config.telegram_token.clone(),
        config.poll_timeout,
    )?);
    let me = transport.get_me().await?;
    tracing::info!(bot_id = me.id, username = ?me.username, "Connected to Telegram");

    let runtime: ProductionRuntime = ConversationRuntime::new(
        store,
        ServiceLlmClient::new(service),
        Arc::clone(&transport),
        config.runtime_settings(),
    );
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(runtime)));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
        }
        shutdown.cancel();
    });

    poll_updates(&transport, &dispatcher, config.poll_timeout, &cancel).await;
    Ok(())
}

/// Long-poll loop. Each update runs on its own task; per-user ordering is
/// enforced by the runtime's user locks.
async fn poll_updates(
    transport: &TelegramTransport,
    dispatcher: &Arc<ProductionDispatcher>,
    poll_timeout: Duration,
    cancel: &CancellationToken,
) {
    let mut offset = 0;
    let mut backoff = INITIAL_BACKOFF;
    let mut in_flight = JoinSet::new();

    tracing::info!("Polling for updates");
    loop {
        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = transport.get_updates(offset, poll_timeout) => result,
        };

        match result {
            Ok(updates) => {
                backoff = INITIAL_BACKOFF;
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let dispatcher = Arc::clone(dispatcher);
                    in_flight.spawn(async move { dispatcher.handle_update(update).await });
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retry_in_secs = backoff.as_secs(),
                    "getUpdates failed"
                );
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }

        while let Some(done) = in_flight.try_join_next() {
            if let Err(e) = done {
                tracing::error!(error = %e, "Update task panicked");
            }
        }
    }

    tracing::info!(pending = in_flight.len(), "Waiting for in-flight exchanges");
    while in_flight.join_next().await.is_some() {}
}
