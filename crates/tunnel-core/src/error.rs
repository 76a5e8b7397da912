use crate::model::Url;
use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    /// The origin URL is already mapped. Carries the canonical record so the
    /// caller can answer with the pre-existing short code.
    #[error("url already exists: {}", .0.original_url)]
    UrlExists(Url),
    /// The short code is already bound to a different origin URL.
    #[error("short code already in use: {0}")]
    ShortCodeCollision(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("store is closed")]
    Closed,
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage i/o failed: {0}")]
    Io(String),
}

impl StorageError {
    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::Unavailable(_) | StorageError::Timeout(_) | StorageError::Io(_)
        )
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShortCode;

    #[test]
    fn url_exists_message_names_the_origin() {
        let err = StorageError::UrlExists(Url {
            id: 1,
            short_url: ShortCode::new_unchecked("abcdefgh"),
            original_url: "https://example.com/a".to_string(),
            user_id: None,
            is_deleted: false,
        });
        assert_eq!(err.to_string(), "url already exists: https://example.com/a");
    }

    #[test]
    fn transient_classification() {
        assert!(StorageError::Timeout("pool".into()).is_transient());
        assert!(StorageError::Io("disk full".into()).is_transient());
        assert!(!StorageError::InvalidData("bad json".into()).is_transient());
        assert!(!StorageError::InvalidUrl("nope".into()).is_transient());
    }
}
