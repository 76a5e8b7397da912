use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    batch_handler, delete_user_urls_handler, ping_handler, redirect_handler,
    shorten_json_handler, shorten_text_handler, user_urls_handler,
};
use crate::session::session_middleware;
use crate::state::AppState;

/// Requests still running after this are answered `504 Gateway Timeout`.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        let session_routes = Router::new()
            .route("/", post(shorten_text_handler))
            .route("/{code}", get(redirect_handler))
            .nest(
                "/api",
                Router::new()
                    .route("/shorten", post(shorten_json_handler))
                    .route("/shorten/batch", post(batch_handler))
                    .route(
                        "/user/urls",
                        get(user_urls_handler).delete(delete_user_urls_handler),
                    ),
            )
            .layer(middleware::from_fn_with_state(
                state.clone(),
                session_middleware,
            ));

        // Gzip request bodies are inflated before they reach the handlers and
        // responses are compressed when the client accepts it.
        Router::new()
            .route("/ping", get(ping_handler))
            .merge(session_routes)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                REQUEST_TIMEOUT,
            ))
            .layer(RequestDecompressionLayer::new())
            .layer(CompressionLayer::new())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
