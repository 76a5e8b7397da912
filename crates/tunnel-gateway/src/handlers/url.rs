use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Json};
use tunnel_shortener::{BatchItem, ShortenerError};

use crate::error::{AppError, Result};
use crate::model::{BatchRequestItem, BatchResponseItem, ShortenRequest, ShortenResponse};
use crate::session::Session;
use crate::state::AppState;

/// `POST /` with the origin as a plain text body.
pub async fn shorten_text_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    body: String,
) -> Result<Response> {
    match state
        .shortener
        .shorten(body.trim(), Some(session.user.id))
        .await
    {
        Ok(url) => Ok((StatusCode::CREATED, state.short_link(&url)).into_response()),
        Err(ShortenerError::AlreadyShortened(url)) => {
            Ok((StatusCode::CONFLICT, state.short_link(&url)).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// `POST /api/shorten` with `{"url": "..."}`.
pub async fn shorten_json_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<ShortenRequest>,
) -> Result<Response> {
    let (status, url) = match state
        .shortener
        .shorten(&request.url, Some(session.user.id))
        .await
    {
        Ok(url) => (StatusCode::CREATED, url),
        Err(ShortenerError::AlreadyShortened(url)) => (StatusCode::CONFLICT, url),
        Err(err) => return Err(err.into()),
    };

    let body = ShortenResponse {
        result: state.short_link(&url),
    };
    Ok((status, Json(body)).into_response())
}

/// `POST /api/shorten/batch`.
pub async fn batch_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<Vec<BatchRequestItem>>,
) -> Result<(StatusCode, Json<Vec<BatchResponseItem>>)> {
    if request.is_empty() {
        return Err(AppError::BadRequest("empty batch".to_string()));
    }

    let items = request
        .into_iter()
        .map(|item| BatchItem {
            correlation_id: item.correlation_id,
            original_url: item.original_url,
        })
        .collect();

    let results = state
        .shortener
        .shorten_batch(items, Some(session.user.id))
        .await?;

    let body = results
        .into_iter()
        .map(|result| BatchResponseItem {
            short_url: state.short_link(&result.url),
            correlation_id: result.correlation_id,
        })
        .collect();

    Ok((StatusCode::CREATED, Json(body)))
}

/// `GET /{code}`: redirects to the origin, or `410 Gone` once deleted.
pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response> {
    let url = state.shortener.resolve(&code).await?;

    if url.is_deleted {
        return Ok(StatusCode::GONE.into_response());
    }
    Ok(Redirect::temporary(&url.original_url).into_response())
}
