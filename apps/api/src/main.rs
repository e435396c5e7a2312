mod auth;
mod batch;
mod config;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod parsing;
mod pipeline;
mod routes;
mod scoring;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, ProviderSettings};
use crate::db::{apply_schema, create_pool};
use crate::extraction::{FileTextExtractor, TesseractOcr};
use crate::llm_client::gemini::GenerationConfig;
use crate::llm_client::{GeminiClient, OpenAiCompatClient, ProviderRegistry};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgRecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    apply_schema(&db).await?;

    // Initialize provider adapters
    let providers = build_providers(&config.providers)?;
    info!(
        "Provider adapters initialized (default model: {})",
        config.providers.gemini_model
    );

    let extractor = Arc::new(FileTextExtractor::new(TesseractOcr::new(
        config.tesseract_path.clone(),
    )));
    let store = Arc::new(PgRecordStore::new(db));

    info!(
        "Batch scheduler: {} file(s) per group, {} call(s)/min, policy '{}'",
        config.batch.batch_size, config.batch.rate_limit_per_minute, config.batch.error_policy
    );

    // Build app state
    let state = AppState::new(config.clone(), providers, extractor, store);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the UI host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Constructs every provider adapter once; handlers reach them through `AppState`.
fn build_providers(settings: &ProviderSettings) -> Result<ProviderRegistry> {
    let gemini = GeminiClient::new(settings.gemini_api_key.clone(), settings.gemini_model.clone())?;
    let cover_letter = gemini.clone().with_generation(GenerationConfig::creative());

    Ok(ProviderRegistry {
        gemini: Arc::new(gemini),
        gpt4: Arc::new(OpenAiCompatClient::gpt4(
            settings.openai_api_key.clone(),
            settings.openai_model.clone(),
        )?),
        deepseek: Arc::new(OpenAiCompatClient::deepseek(
            settings.nvidia_api_key.clone(),
            &settings.nvidia_base_url,
            settings.deepseek_model.clone(),
        )?),
        llama: Arc::new(OpenAiCompatClient::llama(
            settings.nvidia_api_key.clone(),
            &settings.nvidia_base_url,
            settings.llama_model.clone(),
        )?),
        nvidia: Arc::new(OpenAiCompatClient::nvidia_maverick(
            settings.nvidia_api_key.clone(),
            &settings.nvidia_base_url,
        )?),
        cover_letter: Arc::new(cover_letter),
    })
}
