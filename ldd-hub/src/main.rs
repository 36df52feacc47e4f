//! ldd-hub - Limestone detection dashboard hub
//!
//! Receives size-classification reports from sensing nodes, stores them in
//! SQLite and serves the dashboard views plus a live update stream.

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use clap::Parser;
use ldd_common::api::{generate_token, CredentialCheck, StaticToken};
use ldd_common::config::{self, TomlConfig, DEFAULT_BIND_ADDRESS, DEFAULT_PORT};
use ldd_common::db::init_database;
use ldd_common::time::SystemClock;
use ldd_hub::db::SqliteReadingStore;
use ldd_hub::{build_router, AppState, Credentials, Hub, HubSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments; each falls back to its environment variable
#[derive(Parser, Debug)]
#[command(name = "ldd-hub", version, about = "Limestone detection dashboard hub")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "LDD_BIND_ADDRESS")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "LDD_PORT")]
    port: Option<u16>,

    /// Folder holding reports.db
    #[arg(long, env = config::DATA_FOLDER_ENV)]
    data_folder: Option<PathBuf>,

    /// Offset of the local zone in minutes east of UTC (weekly day boundaries)
    #[arg(long, env = "LDD_UTC_OFFSET_MINUTES", allow_hyphen_values = true)]
    utc_offset_minutes: Option<i32>,

    /// Key sensing nodes present on /update
    #[arg(long, env = "DASHBOARD_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Key required for /api/reset (defaults to the api key)
    #[arg(long, env = "DASHBOARD_ADMIN_KEY", hide_env_values = true)]
    admin_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; the configured level replaces the default once the
    // config file is read, unless RUST_LOG was given
    let rust_log_set = std::env::var_os("RUST_LOG").is_some();
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let toml_config = TomlConfig::load(args.config.as_deref())?;
    if !rust_log_set {
        match EnvFilter::try_new(&toml_config.logging.level) {
            Ok(level) => {
                if let Err(e) = filter_handle.reload(level) {
                    warn!("Could not apply configured log level: {}", e);
                }
            }
            Err(e) => warn!(
                "Ignoring invalid logging.level {:?}: {}",
                toml_config.logging.level, e
            ),
        }
    }

    info!(
        "Starting LDD hub (ldd-hub) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let data_folder = config::resolve_data_folder(args.data_folder.as_deref(), &toml_config);
    let db_path = config::database_path(&data_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("opening {}", db_path.display()))?;
    info!("✓ Database ready");

    let api_key = match config::first_valid_key([
        args.api_key.as_deref(),
        toml_config.api_key.as_deref(),
    ]) {
        Some(key) => key,
        None => {
            let key = generate_token();
            warn!("No DASHBOARD_API_KEY configured; generated key for this run: {}", key);
            key
        }
    };
    let admin_key = config::first_valid_key([
        args.admin_key.as_deref(),
        toml_config.admin_key.as_deref(),
    ])
    .unwrap_or_else(|| {
        info!("No admin key configured; reset accepts the api key");
        api_key.clone()
    });

    let offset_minutes = args
        .utc_offset_minutes
        .or(toml_config.utc_offset_minutes)
        .unwrap_or(0);
    let Some(local_offset) = FixedOffset::east_opt(offset_minutes * 60) else {
        bail!("UTC offset of {} minutes is out of range", offset_minutes);
    };
    info!("Weekly days use local offset {}", local_offset);

    let ingest_check: Arc<dyn CredentialCheck> = Arc::new(StaticToken::new(&api_key));
    let admin_check: Arc<dyn CredentialCheck> = Arc::new(StaticToken::new(&admin_key));

    let settings = HubSettings {
        local_offset,
        keep_alive: Duration::from_secs(toml_config.keep_alive_secs.max(1)),
        history_limit: toml_config.history_limit,
        subscriber_queue: toml_config.subscriber_queue.max(1),
    };

    let hub = Arc::new(Hub::new(
        Arc::new(SqliteReadingStore::new(pool.clone())),
        Arc::new(SystemClock),
        Credentials {
            ingest: ingest_check,
            admin: admin_check,
        },
        settings,
    ));

    let app = build_router(AppState::new(hub.clone()));

    let bind = args
        .bind
        .or(toml_config.bind_address.clone())
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let addr = format!("{}:{}", bind, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("ldd-hub listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let shutdown_hub = hub.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
            // Open SSE streams would otherwise keep the server alive
            shutdown_hub.broadcaster().close_all();
        })
        .await?;

    pool.close().await;
    info!("ldd-hub stopped");
    Ok(())
}
