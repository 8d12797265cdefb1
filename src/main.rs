//! Caption Transcript Server
//!
//! Serves caption transcripts for video-platform videos. Caption track
//! metadata is read from the live watch page through a WebDriver-controlled
//! browser, payloads are fetched over plain HTTP, and results are cached
//! per video and language for an hour.

mod browser;
mod cache;
mod captions;
mod config;
mod config_file;
mod error;
mod http;
mod state;

#[cfg(test)]
mod integration;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::browser::{BrowserEngine, WebDriverEngine};
use crate::config::{LoggingConfig, ServerConfig};
use crate::config_file::ConfigFile;
use crate::error::{CaptionError, Result};
use crate::http::create_router;
use crate::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "caption-server";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let first = args.next();

    // `--write-config [path]` dumps the defaults and exits
    if first.as_deref() == Some("--write-config") {
        let path = args.next().unwrap_or_else(|| "config.toml".to_string());
        crate::config_file::generate_default_config(&path)
            .map_err(|e| CaptionError::Config(format!("failed to write {}: {}", path, e)))?;
        println!("Wrote default configuration to {}", path);
        return Ok(());
    }

    // Load configuration
    let config_path = first.unwrap_or_else(|| "config.toml".to_string());
    let (config, load_error) = if std::path::Path::new(&config_path).exists() {
        match ConfigFile::from_file(&config_path) {
            Ok(cf) => (cf.into_server_config(), None),
            Err(e) => (ServerConfig::default(), Some(e)),
        }
    } else {
        (ServerConfig::default(), None)
    };
    let mut config = config.apply_env()?;
    let adjustments = config.normalize();

    init_logging(&config.logging);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Some(e) = load_error {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            config_path,
            e
        );
    }
    for adjustment in adjustments {
        tracing::warn!("Configuration adjusted: {}", adjustment);
    }
    tracing::info!("Configuration loaded: {:?}", config);

    // Browser engine shared by every request
    let engine: Arc<dyn BrowserEngine> = Arc::new(WebDriverEngine::new(config.browser.clone()));
    tracing::info!("Using WebDriver endpoint {}", config.browser.webdriver_url);

    // Create application state
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&engine))?);

    // Background sweep of expired transcripts
    if config.cache.sweep_interval_secs > 0 {
        let state_bg = state.clone();
        let period = Duration::from_secs(config.cache.sweep_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let removed = state_bg.cleanup_expired();
                if removed > 0 {
                    tracing::info!("Evicted {} expired transcript(s)", removed);
                }
            }
        });
    }

    // Build router
    let app = create_router(state.clone());

    // Start server
    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| CaptionError::Config(format!("invalid listen address: {}", e)))?;
    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Closing browser sessions");
    engine.shutdown().await;
    tracing::info!("{} stopped", APP_NAME);

    Ok(())
}

/// Initialize logging with tracing
fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("caption_server={},tower_http=debug", logging.level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if logging.is_json() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
