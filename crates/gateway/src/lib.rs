//! HTTP API gateway for supportline.
//!
//! Exposes the chat engine, document ingestion and search, emotion
//! detection, and a health check as JSON endpoints under `/api`.
//!
//! Built on Axum.

pub mod api;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use supportline_chat::{ChatEngine, ProviderEmotionClassifier};
use supportline_config::{AppConfig, GatewayConfig};
use supportline_core::emotion::EmotionClassifier;
use supportline_retrieval::{EmbeddingRetriever, InMemoryVectorIndex};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub engine: Arc<ChatEngine>,
    /// Document ingestion and direct search; also the engine's retriever.
    pub documents: Arc<EmbeddingRetriever>,
    pub classifier: Arc<dyn EmotionClassifier>,
}

pub type SharedState = Arc<GatewayState>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("No default provider configured: {0}")]
    NoProvider(String),

    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Server error: {0}")]
    Serve(String),
}

/// Wire up provider, index, retriever, engine, and classifier from config.
pub fn build_state(config: AppConfig) -> Result<GatewayState, GatewayError> {
    let router = supportline_providers::build_from_config(&config);
    let provider = router
        .default()
        .ok_or_else(|| GatewayError::NoProvider(config.default_provider.clone()))?;

    let documents = Arc::new(EmbeddingRetriever::from_config(
        Arc::clone(&provider),
        Arc::new(InMemoryVectorIndex::new()),
        &config.retrieval,
    ));
    let engine = Arc::new(ChatEngine::from_config(
        &config,
        documents.clone(),
        Arc::clone(&provider),
    ));
    let classifier = Arc::new(ProviderEmotionClassifier::new(
        provider,
        &config.default_model,
    ));

    Ok(GatewayState {
        config,
        engine,
        documents,
        classifier,
    })
}

/// Build the full router.
///
/// Layers applied:
/// - CORS restricted to the configured origins
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.gateway);

    api::api_router(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), GatewayError> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(build_state(config)?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GatewayError::Bind {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;

    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| GatewayError::Serve(e.to_string()))
}
