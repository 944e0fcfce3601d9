//! ScriptSwift - LLM-powered cold call script builder
//!
//! A Rust backend implementing a conversation state machine that generates
//! and incrementally extends a sales script with an LLM.

mod api;
mod generator;
mod llm;
mod prompts;
mod resolver;
mod runtime;
mod state_machine;
mod transcript;
mod validation;

use api::{create_router, AppState};
use generator::LlmTurnGenerator;
use llm::{LlmConfig, ModelRegistry};
use resolver::{CustomerContextResolver, PlaceholderFetcher};
use runtime::{spawn_runtime, DEFAULT_REQUEST_TIMEOUT};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scriptswift=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let port: u16 = std::env::var("SCRIPTSWIFT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    // Initialize LLM registry
    let llm_config = LlmConfig::from_env();
    let llm_registry = Arc::new(ModelRegistry::new(&llm_config));

    if llm_registry.has_models() {
        tracing::info!(
            models = ?llm_registry.available_models(),
            default = %llm_registry.default_model_id(),
            "LLM registry initialized"
        );
    } else {
        tracing::warn!("No LLM API keys configured. Set ANTHROPIC_API_KEY or LLM_GATEWAY.");
    }

    // Wire the collaborators: script turns on the default model, website
    // summarization on the fast model
    let generator_llm = llm_registry
        .default()
        .ok_or("No LLM available for script generation")?;
    let resolver_llm = llm_registry
        .fast_model()
        .ok_or("No LLM available for website analysis")?;

    let generator = LlmTurnGenerator::new(generator_llm);
    let resolver = CustomerContextResolver::new(PlaceholderFetcher, resolver_llm);

    // One conversation per service instance; its runtime owns all state
    let session = spawn_runtime(resolver, generator, DEFAULT_REQUEST_TIMEOUT);

    // Create application state and router
    let state = AppState::new(session, llm_registry);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("ScriptSwift server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
