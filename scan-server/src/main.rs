//! SCAN help desk server

use std::sync::Arc;

use anyhow::{Context, Result};
use scan_core::SystemClock;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scan_server::{
    routes, AccountStore, AppState, Config, ConsoleEmailSender, EmailSender, InMemoryAccountStore,
    SmtpEmailSender, SqliteAccountStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scan_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        port = config.port,
        database = config.database_path.as_deref().unwrap_or(":memory:"),
        sweep_interval_secs = config.sweep_interval.as_secs(),
        smtp = config.smtp.is_some(),
        "Loaded configuration"
    );

    let email_sender: Box<dyn EmailSender> = match config.smtp.clone() {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Using SMTP email sender");
            Box::new(SmtpEmailSender::new(smtp).map_err(anyhow::Error::msg)?)
        }
        None => {
            tracing::info!("SMTP not configured, emails will be printed to the console");
            Box::new(ConsoleEmailSender::new())
        }
    };

    match config.database_path.clone() {
        Some(path) => {
            let store = SqliteAccountStore::open(&path)
                .with_context(|| format!("opening database {path}"))?;
            serve(config, store, email_sender).await
        }
        None => {
            tracing::warn!("DATABASE_PATH not set, accounts are kept in memory only");
            serve(config, InMemoryAccountStore::new(), email_sender).await
        }
    }
}

async fn serve<S>(config: Config, store: S, email_sender: Box<dyn EmailSender>) -> Result<()>
where
    S: AccountStore + 'static,
{
    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState::new(
        config,
        store,
        email_sender,
        Arc::new(SystemClock),
    ));

    state.sweeper.start();

    let app = routes::create_router(state.clone());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("SCAN server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.sweeper.stop().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
