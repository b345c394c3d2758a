// routes.rs
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{Error, Result};
use crate::handlers;
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/{question_id}/", get(handlers::detail))
        .route("/{question_id}/results/", get(handlers::results))
        .route("/{question_id}/vote/", post(handlers::vote))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Restricts cross-origin access to `origin`, or allows any origin when unset.
pub fn cors_layer(origin: Option<&str>) -> Result<CorsLayer> {
    let cors = CorsLayer::new().allow_methods([Method::GET, Method::POST]);
    match origin {
        None => Ok(cors.allow_origin(Any).allow_headers(Any)),
        Some(origin) => {
            let origin = origin
                .parse::<HeaderValue>()
                .map_err(|_| Error::Config(format!("invalid CORS origin: {origin}")))?;
            Ok(cors
                .allow_origin(origin)
                .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::ACCEPT]))
        }
    }
}
