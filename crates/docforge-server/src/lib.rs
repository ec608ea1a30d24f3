//! HTTP surface for docforge
//!
//! One axum router hosts the three document generators, their token-gated
//! download routes, the auth endpoints, the health check, and the
//! pass-through integrations.

mod auth_routes;
mod error;
mod gate;
mod generators;
mod health;
mod integrations;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use docforge_artifact::ArtifactStore;
use docforge_auth::TokenService;
use docforge_core::{ArtifactKind, DocforgeConfig};
use docforge_database_tools::NotionClient;
use docforge_render::{DocumentRenderer, PresentationRenderer, Renderer, SpreadsheetRenderer};
use docforge_web_tools::{StabilityClient, TranscriptFetcher, WebPageReader};

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DocforgeConfig>,
    pub store: Arc<ArtifactStore>,
    pub tokens: Arc<TokenService>,
    renderers: Arc<Vec<Box<dyn Renderer>>>,
    web_reader: Arc<WebPageReader>,
    transcripts: Arc<TranscriptFetcher>,
    stability: Arc<StabilityClient>,
    notion: Arc<NotionClient>,
    started_at: Instant,
}

impl AppState {
    pub fn new(config: DocforgeConfig, store: Arc<ArtifactStore>) -> anyhow::Result<Self> {
        let tokens = Arc::new(TokenService::new(
            &config.auth.secret,
            Duration::from_secs(config.auth.token_ttl_secs),
        ));

        let renderers: Vec<Box<dyn Renderer>> = vec![
            Box::new(SpreadsheetRenderer),
            Box::new(PresentationRenderer),
            Box::new(DocumentRenderer),
        ];

        let timeout = Duration::from_secs(config.upstream.timeout_secs);

        Ok(Self {
            config: Arc::new(config),
            store,
            tokens,
            renderers: Arc::new(renderers),
            web_reader: Arc::new(WebPageReader::new(timeout)?),
            transcripts: Arc::new(TranscriptFetcher::new(timeout)?),
            stability: Arc::new(StabilityClient::new(timeout)?),
            notion: Arc::new(NotionClient::new(timeout)?),
            started_at: Instant::now(),
        })
    }

    fn renderer_for(&self, kind: ArtifactKind) -> &dyn Renderer {
        self.renderers
            .iter()
            .find(|renderer| renderer.kind() == kind)
            .map(Box::as_ref)
            .unwrap_or(&SpreadsheetRenderer)
    }

    fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub fn create_router(state: AppState) -> Router {
    // Downloads accept a token from the header, the query string, or a
    // marker embedded in the file name.
    let download_routes = Router::new()
        .route(
            "/excel-generator/downloads/:file_name",
            get(generators::download_spreadsheet),
        )
        .route(
            "/powerpoint-generator/downloads/:file_name",
            get(generators::download_presentation),
        )
        .route(
            "/word-generator/downloads/:file_name",
            get(generators::download_document),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gate::download_gate,
        ));

    // Everything else behind auth takes the header form only.
    let protected_routes = Router::new()
        .route(
            "/excel-generator/generate",
            post(generators::generate_spreadsheet),
        )
        .route(
            "/powerpoint-generator/generate",
            post(generators::generate_presentation),
        )
        .route(
            "/word-generator/generate",
            post(generators::generate_document),
        )
        .route("/web-page-reader", get(integrations::read_web_page))
        .route(
            "/youtube-transcript/get-transcript",
            get(integrations::get_transcript),
        )
        .route(
            "/notion-database/query-pages",
            post(integrations::notion_query_pages),
        )
        .route(
            "/notion-database/view-structure",
            post(integrations::notion_view_structure),
        )
        .route(
            "/notion-database/create-page",
            post(integrations::notion_create_page),
        )
        .route(
            "/notion-database/update-page",
            post(integrations::notion_update_page),
        )
        .route(
            "/notion-database/archive-page",
            post(integrations::notion_archive_page),
        )
        .route("/smtp-mail/send", post(integrations::send_mail))
        .route(
            "/stability/generate-image",
            post(integrations::generate_image),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gate::require_bearer,
        ));

    Router::new()
        .route("/health-check", get(health::health_check))
        .route("/auth/login", post(auth_routes::login))
        .route("/auth/verify", post(auth_routes::verify_token))
        .route("/images/:file_name", get(integrations::serve_image))
        .merge(download_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
