//! Persistence boundary shared by every area: the error type, the bounded-deadline helper, and an
//! in-memory implementation of all repository traits.

pub mod memory;

use std::time::Duration;

pub use memory::InMemoryStore;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stale write: expected version {expected}, found {found}")]
    VersionMismatch { expected: u64, found: u64 },
    #[error("stale write: expected status {expected}, found {found}")]
    StaleStatus {
        expected: &'static str,
        found: &'static str,
    },
    #[error("repository call exceeded {0:?}")]
    Timeout(Duration),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RepositoryError::Timeout(_) | RepositoryError::Unavailable(_)
        )
    }
}

/// Run a blocking repository call off the async executor, failing with
/// [`RepositoryError::Timeout`] once `deadline` passes.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, RepositoryError>
where
    F: FnOnce() -> Result<T, RepositoryError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(deadline, tokio::task::spawn_blocking(call)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(RepositoryError::Unavailable(format!(
            "repository task aborted: {join_error}"
        ))),
        Err(_) => Err(RepositoryError::Timeout(deadline)),
    }
}
