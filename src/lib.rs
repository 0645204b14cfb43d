//! # jfifconv: single-file JFIF/JPEG conversion service
//!
//! `jfifconv` is a small, anonymous, stateless web utility: it serves an
//! embedded upload page and a single conversion endpoint that re-encodes an
//! uploaded JFIF/JPEG image as progressive JPEG and returns the result as a
//! base64 data URL inside a JSON envelope.
//!
//! ## Overview
//!
//! There is deliberately no persistence, no authentication, and no
//! cross-request state. A request arrives as `multipart/form-data`, the upload
//! is spooled to a request-scoped temporary file, validated (field presence,
//! declared MIME type, size limit), pushed through the conversion pipeline in
//! [`convert`], and answered with either the JSON envelope or a JSON
//! `{ "error": ... }` body. The temporary file is removed on every exit path.
//!
//! ### Request flow
//!
//! `POST /api/convert` is the only mutating endpoint. `GET /api/config` hands
//! the upload page its metadata and limits, and every other route serves the
//! embedded static assets. The served OpenAPI docs live at `/docs`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use jfifconv::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = jfifconv::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     jfifconv::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config)?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod config;
pub mod convert;
pub mod errors;
mod openapi;
mod static_assets;
pub mod telemetry;

use crate::config::CorsOrigin;
use crate::openapi::ApiDoc;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Slack on top of the upload limit for multipart framing and scalar fields.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Application state shared across request handlers.
///
/// The service is stateless beyond its configuration; there is nothing else
/// to share.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let wildcard = config.cors.allowed_origins.iter().any(|o| *o == CorsOrigin::Wildcard);

    let mut cors = if wildcard {
        CorsLayer::new().allow_origin(Any)
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        CorsLayer::new().allow_origin(origins)
    };

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// - `POST /api/convert` with a body limit derived from the configured upload
///   size (the handler additionally enforces the exact limit while spooling)
/// - `GET /api/config` for the upload page's metadata
/// - `GET /healthz`
/// - served OpenAPI docs at `/docs`
/// - embedded static assets for everything else
/// - CORS and tracing middleware
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let body_limit = state.config.upload.max_file_size as usize + BODY_LIMIT_SLACK;

    let api_routes = Router::new()
        .route(
            "/convert",
            post(api::handlers::convert::convert_image).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/config", get(api::handlers::config::get_config))
        .with_state(state.clone());

    let fallback = get(api::handlers::static_assets::serve_embedded_asset);

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .fallback_service(fallback);

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The assembled application: router plus the configuration it was built from.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let state = AppState::builder().config(config.clone()).build();
        let router = build_router(&state)?;
        Ok(Self { router, config })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "jfifconv listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
