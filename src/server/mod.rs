//! HTTP server: routing, shared state, and startup.

mod analyze;
mod error;
mod handwriting;

pub use analyze::analyze_handler;
pub use handwriting::generate_handwriting_handler;

use crate::ai::{
    AnalysisService, GeminiAnalysisClient, GeminiHandwritingClient, GeminiHttpClient,
    HandwritingService,
};
use crate::models::{Config, RelayMode};
use crate::{Error, Result};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, DefaultBodyLimit},
    http::Request,
    response::Html,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub const MISSING_API_KEY: &str =
    "API key not configured. Please add GEMINI_API_KEY to your .env file.";

/// Largest accepted POST body. Uploads of up to 20 MB grow by a third once
/// base64 encoded.
pub const MAX_REQUEST_BYTES: usize = 32 * 1024 * 1024;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Upstream clients, present only when a credential is configured.
#[derive(Clone)]
pub struct Services {
    pub analysis: Arc<dyn AnalysisService>,
    pub handwriting: Arc<dyn HandwritingService>,
}

/// Shared state for the handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Option<Services>,
    pub relay_mode: RelayMode,
    pub analyze_model: String,
}

impl AppState {
    /// Wires Gemini clients from `config`, sharing one connection pool.
    pub fn from_config(config: &Config, http_client: reqwest::Client) -> Self {
        let services = config.gemini_api_key.as_ref().map(|api_key| {
            let http = GeminiHttpClient::new_with_client(
                api_key.clone(),
                config.upstream_timeout,
                http_client,
            )
            .with_base_url(config.gemini_base_url.clone());

            Services {
                analysis: Arc::new(GeminiAnalysisClient::new(http.clone()))
                    as Arc<dyn AnalysisService>,
                handwriting: Arc::new(GeminiHandwritingClient::new(
                    http,
                    config.handwriting_model.clone(),
                )) as Arc<dyn HandwritingService>,
            }
        });

        Self {
            services,
            relay_mode: config.relay_mode,
            analyze_model: config.analyze_model.clone(),
        }
    }

    /// Fails with the configuration error when no credential was provided.
    pub fn services(&self) -> Result<&Services> {
        self.services
            .as_ref()
            .ok_or_else(|| Error::Configuration(MISSING_API_KEY.to_string()))
    }
}

fn invalid_body(rejection: JsonRejection) -> Error {
    Error::Validation(format!("Invalid request body: {}", rejection.body_text()))
}

/// Build an HTTP client for upstream calls.
pub fn build_http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(config.upstream_timeout)
        .build()
        .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route(
            "/api/analyze",
            post(analyze_handler).layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES)),
        )
        .route(
            "/api/generate-handwriting",
            post(generate_handwriting_handler).layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES)),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}

/// Run the relay server until Ctrl-C.
pub async fn run_server(config: Config, addr: SocketAddr) -> Result<()> {
    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not found in environment or .env file");
        tracing::warn!("API endpoints will answer with a configuration error until it is set");
    }

    let http_client = build_http_client(&config)?;
    let state = AppState::from_config(&config, http_client);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("gemini-relay listening on {}", addr);
    tracing::info!(
        "Relay mode: {:?}, analyze model: {}, handwriting model: {}",
        config.relay_mode,
        config.analyze_model,
        config.handwriting_model
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}
