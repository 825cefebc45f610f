//! services/api/src/bin/api.rs
//!
//! Entry point of the learning assistant API server.

use api_lib::{
    adapters::{DbAdapter, InferenceEndpointAdapter, MemoryStore, OpenAiChatAdapter},
    config::{Config, GenerationBackend, StorageBackend},
    error::ApiError,
    web::{self, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use learning_assistant_core::{
    pipeline::LearningPipeline,
    ports::{AccountStore, GenerationService, LearningStore},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
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

    // --- 2. Connect to Storage & Run Migrations ---
    let (accounts, store): (Arc<dyn AccountStore>, Arc<dyn LearningStore>) = match &config.storage {
        StorageBackend::Postgres { database_url } => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = Arc::new(DbAdapter::new(db_pool));
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            let accounts: Arc<dyn AccountStore> = db_adapter.clone();
            let store: Arc<dyn LearningStore> = db_adapter;
            (accounts, store)
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on restart.");
            let memory = Arc::new(MemoryStore::new());
            let accounts: Arc<dyn AccountStore> = memory.clone();
            let store: Arc<dyn LearningStore> = memory;
            (accounts, store)
        }
    };

    // --- 3. Initialize the Generation Backend ---
    let generator: Arc<dyn GenerationService> = match &config.generation_backend {
        GenerationBackend::Chat { api_base } => {
            let api_key = config.generation_api_key.as_ref().ok_or_else(|| {
                ApiError::Internal("GENERATION_API_KEY or OPENAI_API_KEY is required".to_string())
            })?;
            let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
            if let Some(api_base) = api_base {
                openai_config = openai_config.with_api_base(api_base);
            }
            info!("Using chat-completion backend");
            Arc::new(OpenAiChatAdapter::new(
                Client::with_config(openai_config),
                config.generation_timeout,
            ))
        }
        GenerationBackend::Inference { endpoint } => {
            info!("Using inference endpoint {}", endpoint);
            Arc::new(
                InferenceEndpointAdapter::new(
                    endpoint.clone(),
                    config.generation_api_key.clone(),
                    config.generation_timeout,
                )
                .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?,
            )
        }
    };

    // --- 4. Build the Shared AppState ---
    let pipeline = Arc::new(LearningPipeline::new(
        store.clone(),
        generator,
        config.pipeline.clone(),
    ));
    let app_state = Arc::new(AppState {
        accounts,
        store,
        pipeline,
        config: config.clone(),
    });

    // --- 5. Create the Web Router ---
    let app = web::router(app_state)?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
