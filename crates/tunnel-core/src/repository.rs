use crate::error::Result;
use crate::model::{NewUrl, Url, UrlId, User, UserId};
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// Persistence of short links.
///
/// Every backend implements this contract identically; callers never reach
/// into a backend's internals.
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Validates `url.original_url` and stores a new record for it.
    ///
    /// If the origin is already mapped, returns
    /// [`StorageError::UrlExists`](crate::StorageError::UrlExists) carrying
    /// the canonical record; callers treat that as an idempotent success.
    /// Returns [`StorageError::ShortCodeCollision`](crate::StorageError::ShortCodeCollision)
    /// if the short code is already bound to a different origin.
    async fn create(&self, url: NewUrl) -> Result<Url>;

    async fn find_by_id(&self, id: UrlId) -> Result<Option<Url>>;

    async fn find_by_short_code(&self, code: &ShortCode) -> Result<Option<Url>>;

    /// Returns every record owned by `user_id`, deleted ones included.
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Url>>;

    /// Attaches an owner to an existing record and returns the updated record.
    ///
    /// A no-op when the record is already owned by `user_id`.
    async fn update_owner(&self, url: &Url, user_id: UserId) -> Result<Url>;

    /// Marks a single record deleted. Idempotent, unknown ids are ignored.
    async fn delete(&self, url: &Url) -> Result<()>;

    /// Marks every record in `ids` deleted in one logical operation.
    /// Unknown ids are silently ignored.
    async fn batch_delete(&self, ids: &[UrlId]) -> Result<()>;
}

/// Persistence of anonymous users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Creates the user for `uuid`, or returns the existing one.
    async fn create(&self, uuid: &str) -> Result<User>;

    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;
}

/// The root handle of a storage backend.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    fn url(&self) -> &dyn UrlRepository;

    fn user(&self) -> &dyn UserRepository;

    /// Liveness check. Always succeeds for backends without a network peer.
    async fn ping(&self) -> Result<()>;

    /// Releases the underlying resources (file handles, connections).
    async fn close(&self) -> Result<()>;
}
