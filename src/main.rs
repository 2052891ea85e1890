//! Profile Search API
//!
//! Proxies search and profile lookups to a third-party profile directory.
//!
//! # Environment Variables
//!
//! - `API_URL_SEARCH`: Full URL of the upstream search service
//! - `API_URL_GENOME`: Base URL of the upstream profile service
//! - `UPSTREAM_TIMEOUT_MS`: Per-request upstream timeout (default: `10000`)
//! - `UPSTREAM_USER_AGENT`: User agent sent upstream
//! - `RUST_LOG`: Logging level (e.g., `debug`, `info`, `profile_search=debug`)
//! - `LOG_FORMAT`: `text` (default) | `json`
//! - `HOST`: Server host address (default: `0.0.0.0`)
//! - `PORT`: Server port (default: `3000`)
//! - `WORKER_THREADS`: Number of tokio worker threads (default: logical CPU count)

use std::fmt;
use std::future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use profile_search::api::{AppState, router};
use profile_search::infrastructure::{
    LogFormat, ReqwestUpstreamClient, ServerConfig, UpstreamConfig,
};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() {
    dotenvy::dotenv().ok();

    let server_config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Configuration error: {error}");
            std::process::exit(1);
        }
    };
    init_tracing(server_config.log_format);

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    match server_config.worker_threads.map(cap_worker_threads) {
        Some(threads) => {
            builder.worker_threads(threads);
            tracing::info!(threads, "Tokio worker threads configured");
        }
        None => tracing::info!("Tokio worker threads: logical CPU count"),
    }

    match builder.build() {
        Ok(runtime) => runtime.block_on(serve(server_config)),
        Err(error) => {
            tracing::error!(%error, "Failed to create tokio runtime");
            std::process::exit(1);
        }
    }
}

/// Limits a requested worker count to four threads per available core.
fn cap_worker_threads(requested: usize) -> usize {
    let limit = std::thread::available_parallelism()
        .map_or(64, |parallelism| parallelism.get().saturating_mul(4));
    if requested > limit {
        tracing::warn!(requested, limit, "WORKER_THREADS above limit, capping");
        limit
    } else {
        requested
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "profile_search=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn serve(server_config: ServerConfig) {
    tracing::info!("Starting Profile Search API");

    let upstream_config = match UpstreamConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!("Configuration error: {}", error);
            std::process::exit(1);
        }
    };

    if upstream_config.search_url.is_none() {
        tracing::warn!("API_URL_SEARCH is not set; search requests will fail");
    }
    if upstream_config.profile_base_url.is_none() {
        tracing::warn!("API_URL_GENOME is not set; profile requests will fail");
    }
    tracing::info!(
        timeout_ms = u64::try_from(upstream_config.timeout.as_millis()).unwrap_or(u64::MAX),
        user_agent = %upstream_config.user_agent,
        "Upstream configuration loaded"
    );

    let client = match ReqwestUpstreamClient::new(
        upstream_config.timeout,
        &upstream_config.user_agent,
    ) {
        Ok(client) => client,
        Err(error) => {
            tracing::error!(%error, "Failed to build upstream client");
            std::process::exit(1);
        }
    };

    let application = router(AppState::new(Arc::new(client), upstream_config));

    let address = server_config.bind_address();
    let listener = match TcpListener::bind(address.as_str()).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%error, "Failed to bind to address {}", address);
            std::process::exit(1);
        }
    };

    match listener.local_addr() {
        Ok(address) => tracing::info!("Listening on {}", address),
        Err(error) => tracing::warn!(%error, "Could not determine local address"),
    }

    let shutdown = async {
        let signal = shutdown_signal().await;
        tracing::info!(%signal, "Shutting down, waiting for in-flight proxy requests");
    };

    if let Err(error) = axum::serve(listener, application)
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!(%error, "Server error");
        std::process::exit(1);
    }

    tracing::info!("Server shutdown complete");
}

/// Signal that ended the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        })
    }
}

/// Waits for the first shutdown signal.
///
/// A handler that cannot be installed never fires; the other one still does.
async fn shutdown_signal() -> ShutdownSignal {
    let interrupt = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::warn!(%error, "Failed to install SIGINT handler");
            future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to install SIGTERM handler");
                future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = future::pending::<()>();

    tokio::select! {
        () = interrupt => ShutdownSignal::Interrupt,
        () = terminate => ShutdownSignal::Terminate,
    }
}
