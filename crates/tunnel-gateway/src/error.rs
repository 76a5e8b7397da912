use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;
use tunnel_shortener::ShortenerError;

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Shortener(#[from] ShortenerError),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Shortener(err) => match err {
                ShortenerError::InvalidUrl(_) | ShortenerError::NotFound(_) => {
                    StatusCode::BAD_REQUEST
                }
                ShortenerError::AlreadyShortened(_) => StatusCode::CONFLICT,
                ShortenerError::CodeSpaceExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
                ShortenerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
