//! Buzzword Bingo status board binary.
//!
//! Entry point for the anonymous leaderboard display.

use anyhow::Context;
use bingo_board::{describe_changes, BoardConfig};
use bingo_sdk::{BingoRealtime, FileStore, SubscriptionState};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bingo_board=debug,bingo_sdk=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BoardConfig::from_env().context("invalid board configuration")?;

    tracing::info!("Starting Buzzword Bingo status board");
    tracing::info!("Realtime URL: {}", config.ws_url);
    tracing::info!("API URL: {}", config.api_url);
    tracing::info!("Game: {}", config.game_id);
    tracing::info!(
        "Credential: {}",
        if config.is_authenticated() {
            "player session"
        } else {
            "public device token"
        }
    );

    let store = FileStore::open(&config.store_path).with_context(|| {
        format!(
            "failed to open credential cache {}",
            config.store_path.display()
        )
    })?;

    let mut realtime = BingoRealtime::connect(config.ws_config(), config.client_config(), store)
        .context("failed to set up realtime service")?;
    if let Some(device_id) = &config.device_id {
        realtime = realtime.with_device_id(device_id.clone());
    }

    let subscription = realtime.subscribe(config.subscription_request());
    let mut updates = WatchStream::new(subscription.watch());
    let mut previous = SubscriptionState::default();

    loop {
        tokio::select! {
            update = updates.next() => {
                let Some(current) = update else {
                    break;
                };
                for line in describe_changes(&previous, &current, config.top_n) {
                    tracing::info!("{}", line);
                }
                previous = current;
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for shutdown signal")?;
                break;
            }
        }
    }

    tracing::info!("Shutting down status board");
    subscription.unsubscribe();
    realtime.shutdown();

    let metrics = realtime.pool().metrics();
    tracing::info!(
        "Sockets opened: {}, frames received: {}, frames dropped: {}",
        metrics.sockets_opened(),
        metrics.frames_received(),
        metrics.frames_dropped()
    );

    Ok(())
}
