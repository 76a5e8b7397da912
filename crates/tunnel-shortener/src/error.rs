use thiserror::Error;
use tunnel_core::{StorageError, Url};

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// The origin already has a short link; carries the existing record.
    #[error("url already shortened as {}", .0.short_url)]
    AlreadyShortened(Url),
    #[error("no free short code after {0} attempts")]
    CodeSpaceExhausted(usize),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::InvalidUrl(message) => Self::InvalidUrl(message),
            StorageError::UrlExists(url) => Self::AlreadyShortened(url),
            StorageError::NotFound(message) => Self::NotFound(message),
            other => Self::Storage(other),
        }
    }
}
