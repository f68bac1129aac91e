//! Courier Detect Web Server.
//!
//! This binary serves:
//! - Platform webhooks, verified against the shared secret
//! - The tracking-number classification API
//! - The OAuth install flow
//!
//! Webhook handlers acknowledge synchronously; the only background work is
//! webhook registration after an install and pruning of expired OAuth state.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use courierdetect::oauth::ShopifyOAuth;
use courierdetect::{router, AppState, Catalog, Classifier, Config, Dispatcher};

/// How often expired OAuth state tokens are dropped
const STATE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        webhook_secret_configured = config.webhook_secret.is_some(),
        signature_encoding = %config.signature_encoding,
        oauth_configured = config.api_key.is_some() && config.api_secret.is_some(),
        api_version = %config.api_version,
        app_url = %config.app_url,
        carrier_catalog_path = ?config.carrier_catalog_path,
        "config_loaded"
    );

    // Compile the carrier catalog once; bad patterns stop startup
    let catalog = Catalog::load(config.carrier_catalog_path.as_deref())
        .context("Failed to load carrier catalog")?;
    let classifier =
        Arc::new(Classifier::new(catalog).context("Failed to compile carrier catalog")?);
    info!(carriers = classifier.catalog().len(), "classifier_ready");

    let dispatcher = Dispatcher::with_default_handlers(classifier.clone());
    info!(topics = ?dispatcher.topics(), "dispatcher_ready");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .build()
        .context("Failed to build HTTP client")?;
    let oauth = ShopifyOAuth::new(&config, http);

    spawn_state_purge(oauth.clone());

    // Create application state
    let port = config.port;
    let state = AppState::new(config, classifier, dispatcher, oauth);
    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

fn spawn_state_purge(oauth: ShopifyOAuth) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(STATE_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = oauth.states().purge_expired().await;
            if purged > 0 {
                let pending = oauth.states().pending_count().await;
                info!(purged = purged, pending = pending, "oauth_state_purged");
            }
        }
    });
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

    info!("web_server_shutting_down");
}
