//! `acpnd` — the ACPN management server binary.
//!
//! Usage:
//!   acpnd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/acpn/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod bootstrap;
mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use acpn_core::{Authenticator, Module};

use config::ServerConfig;

/// ACPN management server.
#[derive(Parser, Debug)]
#[command(name = "acpnd", about = "ACPN management server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides the configured one).
    #[arg(long = "listen")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load and verify server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;
    bootstrap::verify_config(&server_config)?;

    let listen = cli.listen.unwrap_or_else(|| server_config.listen.clone());

    // Initialize embedded stores (shared by all modules).
    let data_dir = server_config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let sql: Arc<dyn acpn_sql::SQLStore> = Arc::new(
        acpn_sql::SqliteStore::open(&server_config.sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );
    let kv: Arc<dyn acpn_kv::KVStore> = Arc::new(
        acpn_kv::RedbStore::open(&server_config.redb_path())
            .map_err(|e| anyhow::anyhow!("failed to open KV store: {}", e))?,
    );
    let blob: Arc<dyn acpn_blob::BlobStore> = Arc::new(
        acpn_blob::FileStore::open(&server_config.blob_dir())
            .map_err(|e| anyhow::anyhow!("failed to open blob store: {}", e))?,
    );

    // ── Modules ──

    let auth_config = auth::service::AuthConfig {
        jwt_secret: server_config.jwt.secret.clone(),
        access_token_ttl: server_config.jwt.access_ttl_secs,
        refresh_token_ttl: server_config.jwt.refresh_ttl_secs,
        ..Default::default()
    };
    let auth_module = auth::AuthModule::new(Arc::clone(&sql), Arc::clone(&kv), auth_config)?;
    info!("Auth module initialized");

    // The auth service is the authenticator every other module consumes.
    let authenticator: Arc<dyn Authenticator> = auth_module.service().clone();

    // Seed permissions, default roles and the superadmin account.
    bootstrap::seed(auth_module.service(), &server_config)?;

    let registry_module =
        registry::RegistryModule::new(Arc::clone(&sql), authenticator.clone())?;
    info!("Registry module initialized");

    let dues_module = dues::DuesModule::new(
        Arc::clone(&sql),
        registry_module.service().clone(),
        authenticator.clone(),
    )?;
    info!("Dues module initialized");

    let finance_module = finance::FinanceModule::new(Arc::clone(&sql), authenticator.clone())?;
    info!("Finance module initialized");

    let docs_module =
        docs::DocsModule::new(Arc::clone(&sql), Arc::clone(&blob), authenticator.clone())?;
    info!("Docs module initialized");

    let module_routes = vec![
        (auth_module.name(), auth_module.routes()),
        (registry_module.name(), registry_module.routes()),
        (dues_module.name(), dues_module.routes()),
        (finance_module.name(), finance_module.routes()),
        (docs_module.name(), docs_module.routes()),
    ];

    // Build router and start serving.
    let app = routes::build_router(module_routes);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!("acpnd listening on {}", listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
}
