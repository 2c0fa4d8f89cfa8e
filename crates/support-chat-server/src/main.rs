use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use support_chat_server::auth::JwtManager;
use support_chat_server::config::Settings;
use support_chat_server::database::{DbPool, InMemoryStore, Repository};
use support_chat_server::routes::build_router;
use support_chat_server::services::conversation::PipelineOptions;
use support_chat_server::services::GeminiClient;
use support_chat_server::state::AppState;
use support_chat_server::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_telemetry();

    info!("🚀 Starting support chat server...");

    // Load configuration
    let settings = Settings::load().context("Failed to load configuration")?;
    info!("✅ Configuration loaded");

    if settings.generation.api_key.is_empty() {
        warn!("⚠️ generation.api_key is empty, every reply will use the fallback message");
    }

    let generator = Arc::new(GeminiClient::new(&settings.generation));
    let jwt_manager = Arc::new(JwtManager::from_config(&settings.auth));
    let options = PipelineOptions::from(&settings);

    let state = if settings.database.is_in_memory() {
        warn!("⚠️ Using in-memory store, data is lost on restart");
        AppState::new(Arc::new(InMemoryStore::seeded()), generator, jwt_manager, options)
    } else {
        let db_pool = DbPool::new(&settings.database).await?;
        info!("✅ Database connection established");

        if settings.database.run_migrations {
            db_pool.run_migrations().await?;
        }

        AppState::new(Arc::new(Repository::new(db_pool)), generator, jwt_manager, options)
    };

    let app = build_router(state);

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
