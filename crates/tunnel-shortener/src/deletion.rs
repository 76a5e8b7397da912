use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use typed_builder::TypedBuilder;
use tunnel_core::{StorageError, Store, UrlId};

/// A request to soft-delete some of a session's links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRequest {
    /// UUID of the anonymous session that asked for the deletion.
    pub session: String,
    /// Short codes to delete. Codes the session does not own are ignored.
    pub codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// The session has no user yet, so it owns nothing.
    NoUser,
    /// None of the requested codes are live links of the user.
    NothingToDelete,
    Deleted(usize),
    GaveUp { attempts: u32, error: String },
}

/// Bounded exponential backoff between deletion attempts.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RetryPolicy {
    #[builder(default = 3)]
    pub max_attempts: u32,
    #[builder(default = Duration::from_millis(100))]
    pub initial_backoff: Duration,
    #[builder(default = Duration::from_secs(5))]
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Runs soft deletes detached from the request that asked for them.
///
/// Each attempt runs in its own task, so a panic inside the store is caught
/// and counted as a failed attempt. Transient storage errors and panics are
/// retried under the [`RetryPolicy`]; anything else gives up at once.
///
/// Clones share the set of deletions in flight, which
/// [`DeletionPipeline::shutdown`] drains.
#[derive(Clone)]
pub struct DeletionPipeline {
    store: Arc<dyn Store>,
    policy: RetryPolicy,
    tasks: TaskTracker,
}

impl DeletionPipeline {
    pub fn new(store: Arc<dyn Store>, policy: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            tasks: TaskTracker::new(),
        }
    }

    /// Starts the deletion in the background and returns its handle.
    /// Dropping the handle does not cancel the deletion.
    pub fn submit(&self, request: DeletionRequest) -> JoinHandle<DeletionOutcome> {
        let pipeline = self.clone();
        self.tasks.spawn(async move { pipeline.run(request).await })
    }

    /// Waits for every submitted deletion to finish. Call it before closing
    /// the store.
    pub async fn shutdown(&self) {
        self.tasks.close();
        if !self.tasks.is_empty() {
            info!(pending = self.tasks.len(), "waiting for background deletions");
        }
        self.tasks.wait().await;
    }

    /// Runs the deletion to completion on the current task.
    pub async fn run(&self, request: DeletionRequest) -> DeletionOutcome {
        let request = Arc::new(request);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let store = Arc::clone(&self.store);
            let task_request = Arc::clone(&request);
            let result =
                tokio::spawn(async move { delete_owned(store.as_ref(), &task_request).await })
                    .await;

            let error = match result {
                Ok(Ok(outcome)) => {
                    info!(session = %request.session, ?outcome, "deletion finished");
                    return outcome;
                }
                Ok(Err(err)) if !err.is_transient() => {
                    error!(session = %request.session, attempt, error = %err, "deletion failed");
                    return DeletionOutcome::GaveUp {
                        attempts: attempt,
                        error: err.to_string(),
                    };
                }
                Ok(Err(err)) => err.to_string(),
                Err(join_error) if join_error.is_panic() => {
                    "deletion attempt panicked".to_string()
                }
                Err(join_error) => join_error.to_string(),
            };

            if attempt >= self.policy.max_attempts {
                error!(
                    session = %request.session,
                    attempts = attempt,
                    error = %error,
                    "giving up on deletion"
                );
                return DeletionOutcome::GaveUp {
                    attempts: attempt,
                    error,
                };
            }

            let delay = self.policy.backoff(attempt);
            warn!(
                session = %request.session,
                attempt,
                ?delay,
                error = %error,
                "deletion attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Tombstones the requested codes among the live links the session owns.
async fn delete_owned(
    store: &dyn Store,
    request: &DeletionRequest,
) -> Result<DeletionOutcome, StorageError> {
    let Some(user) = store.user().find_by_uuid(&request.session).await? else {
        return Ok(DeletionOutcome::NoUser);
    };

    let wanted: HashSet<&str> = request.codes.iter().map(String::as_str).collect();
    let ids: Vec<UrlId> = store
        .url()
        .find_by_user_id(user.id)
        .await?
        .into_iter()
        .filter(|url| !url.is_deleted && wanted.contains(url.short_url.as_str()))
        .map(|url| url.id)
        .collect();

    if ids.is_empty() {
        return Ok(DeletionOutcome::NothingToDelete);
    }

    store.url().batch_delete(&ids).await?;
    Ok(DeletionOutcome::Deleted(ids.len()))
}
