use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{Connection, MySql, MySqlPool, QueryBuilder, Row};
use tracing::{debug, info, trace};
use tunnel_core::{
    NewUrl, Result, ShortCode, StorageError, Store, Url, UrlId, UrlRepository, User, UserId,
    UserRepository,
};

const URL_COLUMNS: &str = "url_id, short_url, original_url, user_id, is_deleted";

/// MySQL implementation of the storage port.
///
/// `create` is a single insert guarded by the unique `original_url` and
/// `short_url` keys, so it is race-free without any application-side lock.
/// Text columns use a binary collation and compare like the other backends.
/// Deletion only flips `is_deleted`; rows are never removed.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
    urls: MySqlUrlRepository,
    users: MySqlUserRepository,
}

impl MySqlStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            urls: MySqlUrlRepository { pool: pool.clone() },
            users: MySqlUserRepository { pool: pool.clone() },
            pool,
        }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Query(format!("migration failed: {e}")))?;
        info!("applied mysql migrations");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed => StorageError::Closed,
        sqlx::Error::WorkerCrashed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            StorageError::Unavailable(message)
        }
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn url_from_row(row: &MySqlRow) -> Result<Url> {
    let short_url: String = row.try_get("short_url").map_err(map_sqlx_error)?;

    Ok(Url {
        id: row.try_get("url_id").map_err(map_sqlx_error)?,
        short_url: ShortCode::new_unchecked(short_url),
        original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
        user_id: row.try_get("user_id").map_err(map_sqlx_error)?,
        is_deleted: row.try_get("is_deleted").map_err(map_sqlx_error)?,
    })
}

#[async_trait]
impl Store for MySqlStore {
    fn url(&self) -> &dyn UrlRepository {
        &self.urls
    }

    fn user(&self) -> &dyn UserRepository {
        &self.users
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        conn.ping().await.map_err(map_sqlx_error)
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        info!("closed mysql pool");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MySqlUrlRepository {
    pool: MySqlPool,
}

impl MySqlUrlRepository {
    async fn fetch(&self, id: UrlId) -> Result<Option<Url>> {
        let row = sqlx::query(&format!("SELECT {URL_COLUMNS} FROM urls WHERE url_id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(url_from_row).transpose()
    }

    async fn fetch_by_origin(&self, origin: &str) -> Result<Option<Url>> {
        let row = sqlx::query(&format!(
            "SELECT {URL_COLUMNS} FROM urls WHERE original_url = ? LIMIT 1"
        ))
        .bind(origin)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(url_from_row).transpose()
    }
}

#[async_trait]
impl UrlRepository for MySqlUrlRepository {
    async fn create(&self, url: NewUrl) -> Result<Url> {
        let url = url.validate()?;

        let inserted = sqlx::query("INSERT INTO urls (short_url, original_url) VALUES (?, ?)")
            .bind(url.short_url.as_str())
            .bind(&url.original_url)
            .execute(&self.pool)
            .await;

        match inserted {
            Ok(result) => {
                let record = url.into_url(result.last_insert_id());
                debug!(id = record.id, code = %record.short_url, "created url record");
                Ok(record)
            }
            // Rows are never removed, so the row that won the unique key is
            // still there to report.
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                match self.fetch_by_origin(&url.original_url).await? {
                    Some(existing) => {
                        debug!(
                            id = existing.id,
                            code = %existing.short_url,
                            "origin already shortened"
                        );
                        Err(StorageError::UrlExists(existing))
                    }
                    None => Err(StorageError::ShortCodeCollision(url.short_url.to_string())),
                }
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn find_by_id(&self, id: UrlId) -> Result<Option<Url>> {
        trace!(id, "finding url by id");
        self.fetch(id).await
    }

    async fn find_by_short_code(&self, code: &ShortCode) -> Result<Option<Url>> {
        trace!(code = %code, "finding url by short code");
        let row = sqlx::query(&format!(
            "SELECT {URL_COLUMNS} FROM urls WHERE short_url = ? LIMIT 1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(url_from_row).transpose()
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Url>> {
        trace!(user_id, "finding urls by owner");
        let rows = sqlx::query(&format!(
            "SELECT {URL_COLUMNS} FROM urls WHERE user_id = ? ORDER BY url_id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(url_from_row).collect()
    }

    async fn update_owner(&self, url: &Url, user_id: UserId) -> Result<Url> {
        sqlx::query("UPDATE urls SET user_id = ? WHERE url_id = ?")
            .bind(user_id)
            .bind(url.id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let updated = self
            .fetch(url.id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("url {}", url.id)))?;

        debug!(id = updated.id, user_id, "attached owner");
        Ok(updated)
    }

    async fn delete(&self, url: &Url) -> Result<()> {
        self.batch_delete(&[url.id]).await
    }

    async fn batch_delete(&self, ids: &[UrlId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut query =
            QueryBuilder::<MySql>::new("UPDATE urls SET is_deleted = TRUE WHERE url_id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!(
            requested = ids.len(),
            marked = result.rows_affected(),
            "soft-deleted urls"
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MySqlUserRepository {
    pool: MySqlPool,
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    async fn create(&self, uuid: &str) -> Result<User> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (uuid)
            VALUES (?)
            ON DUPLICATE KEY UPDATE user_id = LAST_INSERT_ID(user_id)
            "#,
        )
        .bind(uuid)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(User {
            id: result.last_insert_id(),
            uuid: uuid.to_string(),
        })
    }

    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT user_id, uuid FROM users WHERE uuid = ? LIMIT 1")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT user_id, uuid FROM users WHERE user_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(user_from_row).transpose()
    }
}

fn user_from_row(row: &MySqlRow) -> Result<User> {
    Ok(User {
        id: row.try_get("user_id").map_err(map_sqlx_error)?,
        uuid: row.try_get("uuid").map_err(map_sqlx_error)?,
    })
}
