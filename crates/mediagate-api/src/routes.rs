//! Route configuration and setup

use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use mediagate_core::Config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// The fulfillment endpoints are mounted only when the local backend is
/// active; with S3 the client talks to the bucket directly and these routes
/// would have nothing to serve.
pub fn build_router(state: AppState) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(&state.config)?;

    let mut router = Router::new()
        .route("/api/health", get(handlers::health::health))
        .route(
            "/api/storage/presign/upload",
            post(handlers::presign::presign_upload),
        )
        .route(
            "/api/storage/presign/download",
            post(handlers::presign::presign_download),
        );

    if state.local.is_some() {
        router = router
            .route("/api/storage/upload", put(handlers::storage::upload_object))
            .route(
                "/api/storage/file/{*key}",
                get(handlers::storage::download_object),
            );
    }

    Ok(router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|o| o.parse()).collect();

        CorsLayer::new()
            .allow_origin(origins?)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}
