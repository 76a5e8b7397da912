use crate::error::{Result, ShortenerError};
use std::sync::Arc;
use tracing::{debug, info};
use tunnel_core::{NewUrl, ShortCode, StorageError, Store, Url, User, UserId};
use tunnel_generator::Generator;

/// How many fresh short codes `shorten` tries before giving up.
pub const DEFAULT_CODE_ATTEMPTS: usize = 3;

/// One entry of a batch shorten request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub correlation_id: String,
    pub original_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub correlation_id: String,
    pub url: Url,
}

/// The shortener's request-level operations.
///
/// Short codes come from the injected [`Generator`]; a code that is already
/// bound to another origin is re-rolled up to `code_attempts` times.
/// Ownership is attached only to records this service creates.
#[derive(Clone)]
pub struct ShortenerService {
    store: Arc<dyn Store>,
    generator: Arc<dyn Generator>,
    code_attempts: usize,
}

impl ShortenerService {
    pub fn new(store: Arc<dyn Store>, generator: Arc<dyn Generator>) -> Self {
        Self {
            store,
            generator,
            code_attempts: DEFAULT_CODE_ATTEMPTS,
        }
    }

    pub fn with_code_attempts(mut self, attempts: usize) -> Self {
        self.code_attempts = attempts.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Stores `origin` under a fresh short code.
    async fn create(&self, origin: &str) -> Result<Url> {
        for attempt in 1..=self.code_attempts {
            let code = self.generator.generate();
            match self.store.url().create(NewUrl::new(code, origin)).await {
                Err(StorageError::ShortCodeCollision(code)) => {
                    debug!(attempt, code = %code, "short code taken, re-rolling");
                }
                result => return result.map_err(Into::into),
            }
        }

        Err(ShortenerError::CodeSpaceExhausted(self.code_attempts))
    }

    async fn attach(&self, url: Url, owner: Option<UserId>) -> Result<Url> {
        match owner {
            Some(user_id) => Ok(self.store.url().update_owner(&url, user_id).await?),
            None => Ok(url),
        }
    }

    /// Shortens `origin`, owned by `owner` when given.
    ///
    /// Fails with [`ShortenerError::AlreadyShortened`] carrying the existing
    /// record if the origin is known already.
    pub async fn shorten(&self, origin: &str, owner: Option<UserId>) -> Result<Url> {
        let url = self.create(origin).await?;
        let url = self.attach(url, owner).await?;

        info!(id = url.id, code = %url.short_url, "shortened url");
        Ok(url)
    }

    /// Shortens every item in order. An origin that is already known yields
    /// its existing record instead of failing the batch.
    pub async fn shorten_batch(
        &self,
        items: Vec<BatchItem>,
        owner: Option<UserId>,
    ) -> Result<Vec<BatchResult>> {
        let mut results = Vec::with_capacity(items.len());

        for item in items {
            let url = match self.create(&item.original_url).await {
                Ok(url) => self.attach(url, owner).await?,
                Err(ShortenerError::AlreadyShortened(existing)) => existing,
                Err(err) => return Err(err),
            };
            results.push(BatchResult {
                correlation_id: item.correlation_id,
                url,
            });
        }

        info!(count = results.len(), "shortened batch");
        Ok(results)
    }

    /// Looks up the record behind `code`. Deleted records are returned too,
    /// with `is_deleted` set.
    pub async fn resolve(&self, code: &str) -> Result<Url> {
        let not_found = || ShortenerError::NotFound(format!("short code {code}"));

        let code = ShortCode::new(code).map_err(|_| not_found())?;
        self.store
            .url()
            .find_by_short_code(&code)
            .await?
            .ok_or_else(not_found)
    }

    /// The live (not deleted) records owned by `user_id`.
    pub async fn user_urls(&self, user_id: UserId) -> Result<Vec<Url>> {
        let urls = self.store.url().find_by_user_id(user_id).await?;
        Ok(urls.into_iter().filter(|url| !url.is_deleted).collect())
    }

    /// Returns the user behind an anonymous session, creating it on first
    /// sight.
    pub async fn session_user(&self, uuid: &str) -> Result<User> {
        Ok(self.store.user().create(uuid).await?)
    }

    pub async fn ping(&self) -> Result<()> {
        Ok(self.store.ping().await?)
    }
}
