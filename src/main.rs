//! commonfs -- content-verified binary object storage gateway.
//!
//! Startup is the only place where failure is fatal: an unreadable config,
//! an unopenable backing store or a failed bind exits the process.  Every
//! failure after that point is recovered per-request.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

/// Command-line arguments for the commonfs server.
#[derive(Parser, Debug)]
#[command(
    name = "commonfs",
    version,
    about = "Content-verified binary object storage gateway"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "commonfs.example.yaml")]
    config: String,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = commonfs::config::load_config(&cli.config)?;

    // Initialize tracing / logging.  RUST_LOG wins over the config level.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Loaded configuration from {}", cli.config);

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    // Initialize the backing store based on config.
    let store: Arc<dyn commonfs::store::object::ObjectStore> =
        match config.storage.backend.as_str() {
            "memory" => {
                info!("Memory object store initialized");
                Arc::new(commonfs::store::memory::MemoryObjectStore::new())
            }
            "sqlite" | _ => {
                let db_path = &config.storage.sqlite.path;
                // Ensure the parent directory exists for the SQLite file.
                if let Some(parent) = std::path::Path::new(db_path).parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let store = commonfs::store::sqlite::SqliteObjectStore::new(db_path)?;
                info!("SQLite object store initialized at {}", db_path);
                Arc::new(store)
            }
        };

    // Initialize the staging area.
    let staging = commonfs::staging::StagingArea::new(&config.staging.dir)?;
    info!("Staging area initialized at {}", config.staging.dir);

    // Build AppState.
    let state = Arc::new(commonfs::AppState {
        config: config.clone(),
        store,
        staging,
    });

    let app = commonfs::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("commonfs listening on {}", bind_addr);

    // Graceful shutdown: on SIGTERM/SIGINT, stop accepting new connections
    // and wait for in-flight requests to complete.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("commonfs shut down");

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
