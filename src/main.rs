mod api;
mod app;
mod auth;
mod config;
mod db;
mod domain;
mod error;
mod logging;
mod middleware;
mod routes;
mod services;

use anyhow::Result;
use std::sync::Arc;

use services::{ChatService, ChatStore, ImageMatcher, IntentRouter, LlmClient, MediaUrls};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        model = %settings.llm_model,
        "Starting chatbot backend"
    );

    // Pick the store: Postgres when configured, in-memory otherwise (dev only)
    let store: Arc<dyn ChatStore> = match &settings.database_url {
        Some(url) => {
            let pool = db::create_pool(&settings, url).await?;
            db::run_migrations(&pool).await?;
            Arc::new(services::PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(services::MemoryStore::new())
        }
    };

    // Chat pipeline, built once and shared
    let matcher = ImageMatcher::new(settings.image_match_threshold);
    let router = IntentRouter::new(LlmClient::new(&settings)?, matcher);
    let chat = ChatService::new(
        store.clone(),
        router,
        matcher,
        MediaUrls::from_settings(&settings)?,
    );

    let verifier = auth::TokenVerifier::from_settings(&settings);

    // Create application state
    let state = app::AppState::new(store, settings.clone(), verifier, chat);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
