//! Append-only, newline-delimited JSON log.
//!
//! Nothing is cached: every operation derives the current state by scanning
//! the log from its end, where the most recent version of a record lives.
//! Updates re-append the full record. Reads and writes are serialized by one
//! mutex that also owns the file handle. Each call is `O(file size)` and runs
//! on tokio's blocking pool.

mod reader;
mod record;

pub use reader::{ReverseLines, DEFAULT_CHUNK_SIZE};
pub use record::Record;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};
use tunnel_core::{
    NewUrl, Result, ShortCode, StorageError, Store, Url, UrlId, UrlRepository, User, UserId,
    UserRepository,
};

#[derive(Debug)]
struct Log {
    path: PathBuf,
    file: Option<File>,
    last_url_id: UrlId,
    last_user_id: UserId,
    /// Set when the file ends in a partial line, so the next append starts a
    /// fresh one.
    needs_newline: bool,
}

type SharedLog = Arc<Mutex<Log>>;

/// Runs `op` with the log locked, off the async worker threads.
async fn with_log<T, F>(log: &SharedLog, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Log) -> Result<T> + Send + 'static,
{
    let log = Arc::clone(log);
    tokio::task::spawn_blocking(move || op(&mut log.lock()))
        .await
        .map_err(|e| StorageError::Unavailable(format!("file store task failed: {e}")))?
}

impl Log {
    fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let mut log = Log {
            path: path.to_path_buf(),
            file: Some(file),
            last_url_id: 0,
            last_user_id: 0,
            needs_newline: false,
        };
        log.recover()?;
        Ok(log)
    }

    fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or(StorageError::Closed)
    }

    /// Takes the highest identifier of each record type, so an id is never
    /// handed out twice even when an old record was re-appended last.
    fn recover(&mut self) -> Result<()> {
        let (mut last_url_id, mut last_user_id) = (0, 0);
        for record in self.records()? {
            match record? {
                Record::Url(url) => last_url_id = last_url_id.max(url.id),
                Record::User(user) => last_user_id = last_user_id.max(user.id),
            }
        }
        self.last_url_id = last_url_id;
        self.last_user_id = last_user_id;

        let mut file = self.file()?;
        let len = file.metadata()?.len();
        if len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            self.needs_newline = last[0] != b'\n';
        }

        Ok(())
    }

    /// Decoded records, most recent first. Blank lines are skipped.
    fn records(&self) -> Result<impl Iterator<Item = Result<Record>> + '_> {
        let file = self.file()?;
        let len = file.metadata()?.len();

        Ok(ReverseLines::new(file, len).filter_map(|line| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(Record::decode(&line)),
            Err(err) => Some(Err(err.into())),
        }))
    }

    /// The latest version of the first URL record matching `matches`.
    ///
    /// Only valid for predicates on fields that never change after creation.
    fn find_url(&self, matches: impl Fn(&Url) -> bool) -> Result<Option<Url>> {
        for record in self.records()? {
            if let Record::Url(url) = record? {
                if matches(&url) {
                    return Ok(Some(url));
                }
            }
        }
        Ok(None)
    }

    fn find_user(&self, matches: impl Fn(&User) -> bool) -> Result<Option<User>> {
        for record in self.records()? {
            if let Record::User(user) = record? {
                if matches(&user) {
                    return Ok(Some(user));
                }
            }
        }
        Ok(None)
    }

    /// Replays every URL record, keeping the latest version per id.
    fn urls(&self) -> Result<Vec<Url>> {
        let mut latest: HashMap<UrlId, Url> = HashMap::new();
        for record in self.records()? {
            if let Record::Url(url) = record? {
                latest.entry(url.id).or_insert(url);
            }
        }

        let mut urls: Vec<Url> = latest.into_values().collect();
        urls.sort_by_key(|url| url.id);
        Ok(urls)
    }

    /// Appends `records` with a single write. A write that fails halfway is
    /// cut back off the file.
    fn append(&mut self, records: &[Record]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        if self.needs_newline {
            buf.push('\n');
        }
        for record in records {
            buf.push_str(&record.encode()?);
            buf.push('\n');
        }

        let mut file = self.file()?;
        let start = file.metadata()?.len();
        if let Err(err) = file.write_all(buf.as_bytes()) {
            self.rollback(start);
            return Err(err.into());
        }
        self.needs_newline = false;

        trace!(count = records.len(), "appended records");
        Ok(())
    }

    /// Truncates the log back to `len`. If that fails too, the next append
    /// starts on a fresh line.
    fn rollback(&mut self, len: u64) {
        let truncated = self
            .file()
            .and_then(|file| file.set_len(len).map_err(StorageError::from));

        match truncated {
            Ok(()) => warn!(path = %self.path.display(), len, "rolled back failed append"),
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "failed to roll back append");
                self.needs_newline = true;
            }
        }
    }

    fn create_url(&mut self, url: NewUrl) -> Result<Url> {
        let mut collision = false;
        for record in self.records()? {
            let Record::Url(existing) = record? else {
                continue;
            };
            if existing.original_url == url.original_url {
                debug!(id = existing.id, code = %existing.short_url, "origin already shortened");
                return Err(StorageError::UrlExists(existing));
            }
            collision |= existing.short_url == url.short_url;
        }

        if collision {
            return Err(StorageError::ShortCodeCollision(url.short_url.to_string()));
        }

        let record = url.into_url(self.last_url_id + 1);
        self.append(&[Record::Url(record.clone())])?;
        self.last_url_id = record.id;

        debug!(id = record.id, code = %record.short_url, "created url record");
        Ok(record)
    }

    fn update_owner(&mut self, id: UrlId, user_id: UserId) -> Result<Url> {
        let mut current = self
            .find_url(|u| u.id == id)?
            .ok_or_else(|| StorageError::NotFound(format!("url {id}")))?;

        if current.user_id == Some(user_id) {
            return Ok(current);
        }

        current.user_id = Some(user_id);
        self.append(&[Record::Url(current.clone())])?;

        debug!(id = current.id, user_id, "attached owner");
        Ok(current)
    }

    fn batch_delete(&mut self, ids: &HashSet<UrlId>) -> Result<usize> {
        let tombstones: Vec<Record> = self
            .urls()?
            .into_iter()
            .filter(|url| ids.contains(&url.id) && !url.is_deleted)
            .map(|mut url| {
                url.is_deleted = true;
                Record::Url(url)
            })
            .collect();

        self.append(&tombstones)?;
        Ok(tombstones.len())
    }

    fn create_user(&mut self, uuid: String) -> Result<User> {
        if let Some(existing) = self.find_user(|user| user.uuid == uuid)? {
            return Ok(existing);
        }

        let user = User {
            id: self.last_user_id + 1,
            uuid,
        };
        self.append(&[Record::User(user.clone())])?;
        self.last_user_id = user.id;

        debug!(id = user.id, "created user");
        Ok(user)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
            info!(path = %self.path.display(), "closed file store");
        }
        Ok(())
    }
}

/// File-backed implementation of the storage port.
#[derive(Debug, Clone)]
pub struct FileStore {
    log: SharedLog,
    urls: FileUrlRepository,
    users: FileUserRepository,
}

impl FileStore {
    /// Opens (or creates) the log at `path` and recovers the id counters.
    ///
    /// Fails with [`StorageError::InvalidData`] if any line is not a valid
    /// record.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let log = Log::open(path.as_ref())?;
        info!(
            path = %log.path.display(),
            last_url_id = log.last_url_id,
            last_user_id = log.last_user_id,
            "opened file store"
        );

        let log = Arc::new(Mutex::new(log));
        Ok(Self {
            urls: FileUrlRepository {
                log: Arc::clone(&log),
            },
            users: FileUserRepository {
                log: Arc::clone(&log),
            },
            log,
        })
    }

    pub fn path(&self) -> PathBuf {
        self.log.lock().path.clone()
    }
}

#[async_trait]
impl Store for FileStore {
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
        with_log(&self.log, Log::close).await
    }
}

#[derive(Debug, Clone)]
pub struct FileUrlRepository {
    log: SharedLog,
}

#[async_trait]
impl UrlRepository for FileUrlRepository {
    async fn create(&self, url: NewUrl) -> Result<Url> {
        let url = url.validate()?;
        with_log(&self.log, move |log| log.create_url(url)).await
    }

    async fn find_by_id(&self, id: UrlId) -> Result<Option<Url>> {
        trace!(id, "finding url by id");
        with_log(&self.log, move |log| log.find_url(|url| url.id == id)).await
    }

    async fn find_by_short_code(&self, code: &ShortCode) -> Result<Option<Url>> {
        trace!(code = %code, "finding url by short code");
        let code = code.clone();
        with_log(&self.log, move |log| log.find_url(|url| url.short_url == code)).await
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Url>> {
        trace!(user_id, "finding urls by owner");
        let urls = with_log(&self.log, |log| log.urls()).await?;
        Ok(urls
            .into_iter()
            .filter(|url| url.user_id == Some(user_id))
            .collect())
    }

    async fn update_owner(&self, url: &Url, user_id: UserId) -> Result<Url> {
        let id = url.id;
        with_log(&self.log, move |log| log.update_owner(id, user_id)).await
    }

    async fn delete(&self, url: &Url) -> Result<()> {
        self.batch_delete(&[url.id]).await
    }

    async fn batch_delete(&self, ids: &[UrlId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let requested = ids.len();
        let wanted: HashSet<UrlId> = ids.iter().copied().collect();
        let marked = with_log(&self.log, move |log| log.batch_delete(&wanted)).await?;

        debug!(requested, marked, "soft-deleted urls");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FileUserRepository {
    log: SharedLog,
}

#[async_trait]
impl UserRepository for FileUserRepository {
    async fn create(&self, uuid: &str) -> Result<User> {
        let uuid = uuid.to_string();
        with_log(&self.log, move |log| log.create_user(uuid)).await
    }

    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<User>> {
        let uuid = uuid.to_string();
        with_log(&self.log, move |log| log.find_user(|user| user.uuid == uuid)).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        with_log(&self.log, move |log| log.find_user(|user| user.id == id)).await
    }
}
