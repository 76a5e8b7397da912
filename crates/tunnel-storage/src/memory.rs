use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};
use tunnel_core::{
    NewUrl, Result, ShortCode, StorageError, Store, Url, UrlId, UrlRepository, User, UserId,
    UserRepository,
};

#[derive(Debug, Default)]
struct State {
    urls: BTreeMap<UrlId, Url>,
    users: BTreeMap<UserId, User>,
    last_url_id: UrlId,
    last_user_id: UserId,
}

type SharedState = Arc<RwLock<State>>;

/// In-memory implementation of the storage port.
///
/// Both repositories share one reader/writer lock, so the duplicate scan and
/// the insert of a `create` happen in the same critical section. Reads hand
/// out copies of the stored records. Dedup is a linear scan over all records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    urls: InMemoryUrlRepository,
    users: InMemoryUserRepository,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        let state = SharedState::default();
        Self {
            urls: InMemoryUrlRepository {
                state: Arc::clone(&state),
            },
            users: InMemoryUserRepository { state },
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn url(&self) -> &dyn UrlRepository {
        &self.urls
    }

    fn user(&self) -> &dyn UserRepository {
        &self.users
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryUrlRepository {
    state: SharedState,
}

#[async_trait]
impl UrlRepository for InMemoryUrlRepository {
    async fn create(&self, url: NewUrl) -> Result<Url> {
        let url = url.validate()?;
        let mut state = self.state.write();

        if let Some(existing) = state
            .urls
            .values()
            .find(|u| u.original_url == url.original_url)
        {
            debug!(id = existing.id, code = %existing.short_url, "origin already shortened");
            return Err(StorageError::UrlExists(existing.clone()));
        }

        if state.urls.values().any(|u| u.short_url == url.short_url) {
            return Err(StorageError::ShortCodeCollision(url.short_url.to_string()));
        }

        state.last_url_id += 1;
        let record = url.into_url(state.last_url_id);
        state.urls.insert(record.id, record.clone());

        debug!(id = record.id, code = %record.short_url, "created url record");
        Ok(record)
    }

    async fn find_by_id(&self, id: UrlId) -> Result<Option<Url>> {
        trace!(id, "finding url by id");
        Ok(self.state.read().urls.get(&id).cloned())
    }

    async fn find_by_short_code(&self, code: &ShortCode) -> Result<Option<Url>> {
        trace!(code = %code, "finding url by short code");
        Ok(self
            .state
            .read()
            .urls
            .values()
            .find(|u| &u.short_url == code)
            .cloned())
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Url>> {
        trace!(user_id, "finding urls by owner");
        Ok(self
            .state
            .read()
            .urls
            .values()
            .filter(|u| u.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn update_owner(&self, url: &Url, user_id: UserId) -> Result<Url> {
        let mut state = self.state.write();
        let record = state
            .urls
            .get_mut(&url.id)
            .ok_or_else(|| StorageError::NotFound(format!("url {}", url.id)))?;

        if record.user_id != Some(user_id) {
            record.user_id = Some(user_id);
            debug!(id = record.id, user_id, "attached owner");
        }

        Ok(record.clone())
    }

    async fn delete(&self, url: &Url) -> Result<()> {
        self.batch_delete(&[url.id]).await
    }

    async fn batch_delete(&self, ids: &[UrlId]) -> Result<()> {
        let mut state = self.state.write();
        let mut marked = 0usize;
        for id in ids {
            if let Some(record) = state.urls.get_mut(id) {
                if !record.is_deleted {
                    record.is_deleted = true;
                    marked += 1;
                }
            }
        }

        debug!(requested = ids.len(), marked, "soft-deleted urls");
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    state: SharedState,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, uuid: &str) -> Result<User> {
        let mut state = self.state.write();

        if let Some(existing) = state.users.values().find(|u| u.uuid == uuid) {
            return Ok(existing.clone());
        }

        state.last_user_id += 1;
        let user = User {
            id: state.last_user_id,
            uuid: uuid.to_string(),
        };
        state.users.insert(user.id, user.clone());

        debug!(id = user.id, "created user");
        Ok(user)
    }

    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<User>> {
        Ok(self
            .state
            .read()
            .users
            .values()
            .find(|u| u.uuid == uuid)
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().users.get(&id).cloned())
    }
}
