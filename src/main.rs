use std::sync::Arc;

use tracing::info;

use chempay_backend::api::{self, AppState};
use chempay_backend::dispatch::PaymentDispatcher;
use chempay_backend::logging::init_tracing;
use chempay_backend::providers::http::HttpProviderFactory;
use chempay_backend::receipts::{FilesystemReceiptStorage, ReceiptIntake};
use chempay_backend::sessions::SessionManager;
use chempay_backend::{InMemoryGatewayStore, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let settings = Settings::load()?;
    info!(bind_addr = %settings.bind_addr, "starting chempay payment backend");

    let gateways = Arc::new(InMemoryGatewayStore::new());
    let sessions = Arc::new(SessionManager::new());
    let factory = Arc::new(HttpProviderFactory);
    let dispatcher = Arc::new(PaymentDispatcher::new(
        gateways.clone(),
        factory,
        sessions.clone(),
        settings.poller_config(),
    ));
    let receipts = Arc::new(ReceiptIntake::new(Arc::new(FilesystemReceiptStorage::new(
        settings.receipt_dir.clone(),
    ))));

    let app = api::router(AppState {
        gateways,
        dispatcher,
        sessions,
        receipts,
    });

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "payment backend listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("payment backend stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown handler");
    }
    info!("shutdown signal received");
}
