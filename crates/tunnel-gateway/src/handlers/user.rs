use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use tunnel_shortener::DeletionRequest;

use crate::error::Result;
use crate::model::UserUrlResponse;
use crate::session::Session;
use crate::state::AppState;

/// `GET /api/user/urls`: the session's live links, `204` when it has none.
pub async fn user_urls_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    let urls = state.shortener.user_urls(session.user.id).await?;
    if urls.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<UserUrlResponse> = urls
        .into_iter()
        .map(|url| UserUrlResponse {
            short_url: state.short_link(&url),
            original_url: url.original_url,
        })
        .collect();
    Ok(Json(body).into_response())
}

/// `DELETE /api/user/urls` with a JSON list of short codes.
///
/// Answers `202 Accepted` at once; the deletion itself runs in the
/// background.
pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(codes): Json<Vec<String>>,
) -> StatusCode {
    // Detached: the pipeline logs its own outcome.
    let _ = state.deletion.submit(DeletionRequest {
        session: session.uuid,
        codes,
    });
    StatusCode::ACCEPTED
}
