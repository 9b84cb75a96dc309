// Odoo Bill Webhook - Web Server
// GET/POST /api/odoo-command

use anyhow::{Context, Result};
use odoo_bill_webhook::server::{router, COMMAND_PATH};
use odoo_bill_webhook::{init_logging, Config};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::from_env();
    if config.webhook_secret.is_none() {
        tracing::warn!("WEBHOOK_SECRET is not set; every command will be rejected");
    }
    if let Err(e) = config.odoo_credentials() {
        tracing::warn!(error = %e, "Bill commands will fail until Odoo is configured");
    }

    let addr = config.bind_addr.clone();
    let app = router(config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(
        addr = %addr,
        path = COMMAND_PATH,
        version = odoo_bill_webhook::VERSION,
        "Webhook listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
    }
    tracing::info!("Shutting down");
}
