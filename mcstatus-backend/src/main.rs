use mcstatus_backend::config::Config;
use mcstatus_backend::create_app;
use mcstatus_cache::{MinecraftQuery, StatusCache};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for structured logging
    #[cfg(debug_assertions)]
    let log_level = tracing::Level::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = tracing::Level::INFO;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level.as_str())),
        )
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting Minecraft status server...");

    // Invalid configuration is fatal: nothing is served until it parses
    let config = Config::from_env().inspect_err(|e| tracing::error!("Invalid configuration: {e}"))?;
    tracing::info!(
        "Configuration: port={}, target={}:{}, query_timeout={}ms, cache_ttl={}ms, request_timeout={}s",
        config.port,
        config.mc_host,
        config.mc_port,
        config.query_timeout.as_millis(),
        config.cache_ttl.as_millis(),
        config.request_timeout.as_secs()
    );
    tracing::info!(
        "Rate limit: {}/min (burst {}), forwarding favicon={}, players={}, debug={}",
        config.rate_limit_per_min,
        config.rate_limit_burst,
        config.include_favicon,
        config.include_player_list,
        config.include_debug
    );

    let cache = StatusCache::new(Arc::new(MinecraftQuery), config.cache_settings());
    let app = create_app(cache, config.request_timeout, config.rate_limit());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for SIGINT: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
