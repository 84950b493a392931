use anyhow::Context;
use gitconnect::api::{self, app_state::AppState};
use gitconnect::config::loader::{ConfigLoader, default_config_path};
use gitconnect::observability::init_tracing;
use gitconnect::security::auth::JwtTokenGenerator;
use tracing::info;

/// Lifetime of tokens printed by `gitconnect token <account_id>`
const ISSUED_TOKEN_SECONDS: u64 = 24 * 60 * 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("GITCONNECT_CONFIG")
        .map(Into::into)
        .unwrap_or_else(|_| default_config_path());
    let config = ConfigLoader::load_from(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    ConfigLoader::validate(&config).context("Invalid configuration")?;

    // Issue a token for an account and exit
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let [command, account_id] = args.as_slice() {
        if command == "token" {
            let token = JwtTokenGenerator::from_settings(&config.security, ISSUED_TOKEN_SECONDS)
                .generate_token(account_id)?;
            println!("{}", token);
            return Ok(());
        }
    }

    let _log_guard = init_tracing(&config.logging)?;
    info!(
        environment = %config.environment,
        backend = ?config.database.backend,
        "Starting {}...",
        config.app_name
    );

    tokio::fs::create_dir_all(&config.assets.root)
        .await
        .with_context(|| format!("Failed to create asset root {}", config.assets.root.display()))?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app_state = AppState::from_config(config).await?;
    info!("Application state created");

    let router = api::initialize_api(app_state).await?;
    info!("API router created with observability endpoints");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
