use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::config::{LedgerConfig, StorageConfig};
use crate::events::InMemoryEventLog;
use crate::identity::UserId;
use crate::reputation::{LedgerCommit, LedgerEntry, LedgerRepository, ReputationLedger};
use crate::store::{InMemoryStore, RepositoryError};
use crate::users::{User, UserRepository, UserType};

pub(super) type MemoryLedger = ReputationLedger<InMemoryStore, InMemoryEventLog>;

pub(super) fn fast_config(max_attempts: u32) -> LedgerConfig {
    LedgerConfig {
        max_attempts,
        backoff: Duration::from_millis(1),
        ..LedgerConfig::default()
    }
}

pub(super) fn build_ledger(
    config: LedgerConfig,
) -> (Arc<MemoryLedger>, Arc<InMemoryStore>, Arc<InMemoryEventLog>) {
    let store = Arc::new(InMemoryStore::new());
    let events = Arc::new(InMemoryEventLog::default());
    let ledger = ReputationLedger::new(
        Arc::clone(&store),
        Arc::clone(&events),
        config,
        StorageConfig::default(),
    );
    (Arc::new(ledger), store, events)
}

pub(super) fn member(id: &str) -> User {
    User::new(
        UserId::from(id),
        "Ravi",
        format!("{id}@example.com"),
        UserType::Student,
    )
}

pub(super) fn seed<S: UserRepository>(store: &S, user: User) -> UserId {
    store.insert_user(user).expect("seed user").id
}

pub(super) fn stored<S: UserRepository>(store: &S, id: &UserId) -> User {
    store
        .fetch_user(id)
        .expect("fetch user")
        .expect("user present")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}

/// Store that lets a competing writer commit `+1` just before each of the first `races`
/// commits it receives, so those commits arrive with a stale version.
pub(super) struct RacingStore {
    pub(super) inner: InMemoryStore,
    races: AtomicU32,
    pub(super) commits_seen: AtomicU32,
}

impl RacingStore {
    pub(super) fn new(races: u32) -> Self {
        Self {
            inner: InMemoryStore::new(),
            races: AtomicU32::new(races),
            commits_seen: AtomicU32::new(0),
        }
    }
}

impl UserRepository for RacingStore {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        self.inner.insert_user(user)
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        self.inner.fetch_user(id)
    }

    fn update_user(&self, user: User, expected_version: u64) -> Result<User, RepositoryError> {
        self.inner.update_user(user, expected_version)
    }
}

impl LedgerRepository for RacingStore {
    fn commit_entry(&self, commit: LedgerCommit) -> Result<(LedgerEntry, User), RepositoryError> {
        self.commits_seen.fetch_add(1, Ordering::SeqCst);
        let raced = self
            .races
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if raced {
            let current = self.inner.fetch_user(&commit.user_id)?.ok_or(RepositoryError::NotFound)?;
            self.inner.commit_entry(LedgerCommit {
                user_id: current.id.clone(),
                expected_version: current.version,
                amount: 1,
                reason: "competing writer".to_string(),
                balance_after: current.reputation + 1,
                tier: current.tier,
                created_at: Utc::now(),
            })?;
        }
        self.inner.commit_entry(commit)
    }

    fn entries_for(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>, RepositoryError> {
        self.inner.entries_for(user_id)
    }
}

/// Store whose ledger commits outlive any reasonable deadline.
pub(super) struct StalledStore {
    pub(super) inner: InMemoryStore,
    pub(super) stall: Duration,
    pub(super) commits_seen: AtomicU32,
}

impl UserRepository for StalledStore {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        self.inner.insert_user(user)
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        self.inner.fetch_user(id)
    }

    fn update_user(&self, user: User, expected_version: u64) -> Result<User, RepositoryError> {
        self.inner.update_user(user, expected_version)
    }
}

impl LedgerRepository for StalledStore {
    fn commit_entry(&self, commit: LedgerCommit) -> Result<(LedgerEntry, User), RepositoryError> {
        self.commits_seen.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.stall);
        self.inner.commit_entry(commit)
    }

    fn entries_for(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>, RepositoryError> {
        self.inner.entries_for(user_id)
    }
}

pub(super) struct UnavailableStore;

impl UserRepository for UnavailableStore {
    fn insert_user(&self, _user: User) -> Result<User, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_user(&self, _id: &UserId) -> Result<Option<User>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_user(&self, _user: User, _expected_version: u64) -> Result<User, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl LedgerRepository for UnavailableStore {
    fn commit_entry(&self, _commit: LedgerCommit) -> Result<(LedgerEntry, User), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn entries_for(&self, _user_id: &UserId) -> Result<Vec<LedgerEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}
