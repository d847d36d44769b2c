use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_share::{
    api,
    config::Config,
    discovery,
    events::Broadcaster,
    object_store::LocalStore,
    service::{FileService, UploadLimits},
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "file-share starting");

    // Load configuration
    let config = Config::load()?;

    // Content directory
    let object_store = LocalStore::new(&config.storage.upload_dir, config.max_upload_size)?;
    info!("Storing uploads in: {}", config.storage.upload_dir);

    let service = FileService::new(
        Arc::new(object_store),
        Broadcaster::new(config.event_buffer_size),
        UploadLimits::from(&config),
    );

    let listener = tokio::net::TcpListener::bind(config.socket_addr()?).await?;
    let port = listener.local_addr()?.port();

    let state = Arc::new(AppState {
        config: config.clone(),
        port,
        service,
    });

    let app = api::create_router(Arc::clone(&state));

    let host = match &config.server.public_host {
        Some(host) => host.clone(),
        None => discovery::resolve_lan_address().await,
    };
    info!("Listening on: {}", config.server.bind_address);
    info!("Local:   {}", discovery::access_url(discovery::LOCALHOST, port));
    info!("Network: {}", discovery::access_url(&host, port));
    info!("Scan the QR code at GET /qr to open it on another device");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
