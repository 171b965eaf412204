use notification_sync::{
    metrics, ConnectOutcome, ConnectionEvent, ListFilter, NotificationSession, RefreshMode,
    SyncConfig,
};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting notification sync");

    let config = SyncConfig::from_env()?;
    let session = NotificationSession::from_config(&config)?;
    let mut events = session.events();

    match session.connect() {
        ConnectOutcome::Unauthenticated => {
            tracing::warn!(
                "No session token in {} or token file; push channel stays closed",
                config.session.token_env
            );
        }
        outcome => tracing::info!("Push connection {:?} to {}", outcome, config.push.url),
    }

    match session.refresh(RefreshMode::Full).await {
        Ok(outcome) => tracing::info!(
            "Initial refresh {:?}, {} unread",
            outcome,
            session.unread_count()
        ),
        Err(e) => tracing::warn!("Initial refresh failed: {}", e),
    }

    match session.fetch(1, ListFilter::unread()).await {
        Ok(unread) => tracing::debug!("Server reports {} unread on the first page", unread.len()),
        Err(e) => tracing::debug!("Unread query failed: {}", e),
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                break;
            }
            event = events.recv() => match event {
                Ok(ConnectionEvent::StateChanged(state)) => {
                    tracing::info!("Push connection {:?}, {} unread", state, session.unread_count());
                }
                Ok(ConnectionEvent::ReconnectExhausted { attempts }) => {
                    tracing::error!("Push channel down after {} attempts; restart to retry", attempts);
                }
                Ok(other) => tracing::debug!("{:?}", other),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Skipped {} connection events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    session.disconnect();
    tracing::debug!("Final metrics:\n{}", metrics::render());

    Ok(())
}
