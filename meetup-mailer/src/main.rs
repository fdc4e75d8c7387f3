//! Meetup Mailer - tool server for registrant broadcasts and click reports.
//!
//! Runs two surfaces in one process:
//! - the tool protocol on stdin/stdout (fetch responses, broadcast, read clicks)
//! - the click-tracking endpoints on `TRACK_PORT`
//!
//! If the port is already taken (for example by a terminal-launched
//! `meetup-tracker`), the tools keep running and read the same ledger file.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::io::{stdin, stdout, BufReader};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use meetup::web::{router, AppState};
use meetup::{
    ClickLedger, Config, FileLedger, MailTransport, MailgunTransport, McpServer, SheetFetcher,
    Toolbox,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Structured JSON logging on stderr; stdout carries the tool protocol
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_writer(std::io::stderr),
        )
        .init();

    info!("mailer_starting");

    let config = Config::from_env();
    info!(
        spreadsheet_id = %config.spreadsheet_id,
        sheet_gid = config.sheet_gid,
        track_port = config.track_port,
        clicks_file = %config.clicks_file.display(),
        mail_configured = config.mail_credentials().is_ok(),
        "config_loaded"
    );

    let timeout = Duration::from_millis(config.request_timeout_ms);
    let client = Client::builder()
        .build()
        .context("Failed to create HTTP client")?;

    let ledger: Arc<dyn ClickLedger> = Arc::new(FileLedger::new(config.clicks_file.clone()));

    let mailer: Option<Arc<dyn MailTransport>> = match config.mail_credentials() {
        Ok(credentials) => Some(Arc::new(MailgunTransport::new(
            client.clone(),
            credentials,
            timeout,
        ))),
        Err(e) => {
            warn!(error = %e, "mail_transport_unconfigured");
            None
        }
    };

    let fetcher = SheetFetcher::new(client, config.sheets_base_url.clone(), timeout);
    let tools = Toolbox::new(Arc::new(config.clone()), fetcher, Arc::clone(&ledger), mailer);

    // Click endpoints
    let addr = SocketAddr::from(([0, 0, 0, 0], config.track_port));
    match TcpListener::bind(addr).await {
        Ok(listener) => {
            info!(address = %addr, "click_server_listening");
            let app = router(AppState::new(ledger));
            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    error!(error = %e, "click_server_error");
                }
            });
        }
        Err(e) => {
            warn!(address = %addr, error = %e, "click_server_bind_failed");
        }
    }

    // Tool protocol until stdin closes or a signal arrives
    let server = McpServer::new(tools);
    tokio::select! {
        result = server.serve(BufReader::new(stdin()), stdout()) => {
            result.context("Tool protocol I/O error")?;
        }
        _ = shutdown_signal() => {}
    }

    info!("mailer_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("mailer_shutting_down");
}
