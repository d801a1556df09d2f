//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DbAdapter, LlmDebugAssistant, OpenAiCompletionAdapter, RedisSessionStore,
        TieredSessionStore, TrustedHeaderIdentity,
    },
    config::Config,
    error::ApiError,
    web::{build_router, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use debugmate_core::ports::SessionStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool, config.default_sessions_limit));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Model Gateway ---
    let api_key = config
        .llm_api_key
        .as_ref()
        .ok_or_else(|| ApiError::Internal("LLM_API_KEY is required".to_string()))?;
    let llm_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(&config.llm_api_base);
    let completion = Arc::new(OpenAiCompletionAdapter::new(
        Client::with_config(llm_config),
        config.llm_model.clone(),
    ));
    let assistant = Arc::new(LlmDebugAssistant::new(completion));

    // --- 4. Initialize the Session Store ---
    let shared: Option<Arc<dyn SessionStore>> = match &config.redis_url {
        Some(url) => {
            let store = RedisSessionStore::new(url)
                .map_err(|e| ApiError::Internal(format!("Invalid REDIS_URL: {}", e)))?;
            match tokio::time::timeout(config.session_store_timeout, store.ping()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    "Shared session store unreachable ({}); drafts stay local until it recovers.",
                    e
                ),
                Err(_) => warn!(
                    "Shared session store did not answer within {:?}; drafts stay local until it recovers.",
                    config.session_store_timeout
                ),
            }
            Some(Arc::new(store) as Arc<dyn SessionStore>)
        }
        None => {
            warn!("REDIS_URL not set; drafts will be local to this instance.");
            None
        }
    };
    let sessions = Arc::new(TieredSessionStore::new(
        shared,
        config.session_store_timeout,
    ));
    info!(
        "Session store ready (shared tier: {}).",
        sessions.has_shared_tier()
    );

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        identity: Arc::new(TrustedHeaderIdentity::new()),
        sessions,
        assistant,
    });

    // --- 6. Create the Web Router ---
    let app = build_router(app_state)?;

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
