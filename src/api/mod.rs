//! API layer -- axum routes, handlers, and middleware.

mod codec;
pub mod problem;
mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

use self::problem::ApiError;
use self::state::AppState;

/// Build the application router with all API routes.
pub fn router(state: AppState) -> Router {
    let body_limit = state.body_limit;

    Router::new()
        .route("/health", get(routes::health))
        .nest("/v1", routes::api_routes())
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Micros),
                ),
        )
        .with_state(state)
}

async fn fallback() -> ApiError {
    ApiError::NotFound
}
