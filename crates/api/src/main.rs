//! credit-gate: query API plus the recharge mailbox watcher.

use std::sync::Arc;

use api::{routes, AppState, Config, CreditGate, GeminiClassifier, MailNotifier};
use database::Database;
use mail_bridge::{ImapConnector, MailConfig, MailSender};
use recharge::{RechargeConfig, RechargeSupervisor, SqlLedger};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let mail_config = MailConfig::from_env()?;
    let recharge_config = RechargeConfig::from_env()?;
    info!(addr = %config.addr, mailbox = %recharge_config.mailbox, "Starting credit-gate");

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    // Recharge watcher owns the single IMAP session
    let ledger = SqlLedger::new(db.clone(), recharge_config.replenish_credits);
    let notifier = MailNotifier::new(MailSender::new(&mail_config)?, &recharge_config);
    let recharge = RechargeSupervisor::new(
        ImapConnector::new(mail_config),
        ledger,
        recharge_config,
    )
    .spawn();

    let classifier = GeminiClassifier::new(config.gemini.clone())?;
    let gate = CreditGate::new(db.clone(), Arc::new(classifier), Arc::new(notifier));
    let state = AppState::new(gate, Some(recharge.subscribe()));

    let app = routes::router().with_state(state);

    info!(addr = %config.addr, "API server listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    recharge.shutdown().await;
    db.close().await;
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
