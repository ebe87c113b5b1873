use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use super::domain::{LedgerCommit, LedgerEntry, ReconcileReport, ReputationStanding};
use super::repository::LedgerRepository;
use crate::config::{LedgerConfig, StorageConfig};
use crate::events::{publish_best_effort, DomainEvent, EventPublisher};
use crate::identity::UserId;
use crate::store::{with_deadline, RepositoryError};
use crate::tiers::TierBreakpoints;
use crate::users::{User, UserRepository};

const MAX_BACKOFF_SHIFT: u32 = 10;

/// Serialized writer for a user's reputation. Every append is a compare-and-swap on the user
/// version, retried with exponential backoff up to `LedgerConfig::max_attempts`.
pub struct ReputationLedger<S, E> {
    store: Arc<S>,
    events: Arc<E>,
    config: LedgerConfig,
    storage: StorageConfig,
}

impl<S, E> ReputationLedger<S, E>
where
    S: UserRepository + LedgerRepository + 'static,
    E: EventPublisher + 'static,
{
    pub fn new(store: Arc<S>, events: Arc<E>, config: LedgerConfig, storage: StorageConfig) -> Self {
        Self {
            store,
            events,
            config,
            storage,
        }
    }

    pub fn breakpoints(&self) -> &TierBreakpoints {
        &self.config.breakpoints
    }

    /// Append a signed delta for `user_id` and recompute the tier from the resulting total.
    pub async fn append(
        &self,
        user_id: &UserId,
        amount: i64,
        reason: &str,
    ) -> Result<LedgerEntry, LedgerError> {
        let reason = validate_delta(amount, reason)?;
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            let user = self.load_user(user_id).await?;
            if user.is_banned {
                return Err(LedgerValidation::UserBanned(user.id).into());
            }

            let balance_after = apply_delta(user.reputation, amount)?;
            let commit = LedgerCommit {
                user_id: user.id.clone(),
                expected_version: user.version,
                amount,
                reason: reason.clone(),
                balance_after,
                tier: self.config.breakpoints.tier_for(balance_after),
                created_at: Utc::now(),
            };

            let store = Arc::clone(&self.store);
            match with_deadline(self.storage.timeout, move || store.commit_entry(commit)).await {
                Ok((entry, updated)) => {
                    info!(
                        user_id = %entry.user_id,
                        amount,
                        balance_after = entry.balance_after,
                        "reputation entry committed"
                    );
                    self.announce(&user, &updated, &entry);
                    return Ok(entry);
                }
                Err(RepositoryError::VersionMismatch { expected, found }) => {
                    warn!(
                        %user_id,
                        attempt,
                        expected,
                        found,
                        "concurrent reputation write won; retrying"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.backoff_for(attempt)).await;
                    }
                }
                Err(RepositoryError::NotFound) => {
                    return Err(LedgerError::NotFound(user_id.clone()))
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(LedgerError::ConcurrencyConflict {
            user_id: user_id.clone(),
            attempts,
        })
    }

    pub async fn standing(&self, user_id: &UserId) -> Result<ReputationStanding, LedgerError> {
        let user = self.load_user(user_id).await?;
        let standing = self.config.breakpoints.standing(user.reputation);

        Ok(ReputationStanding {
            can_graduate: user.can_graduate(),
            user_id: user.id,
            reputation: user.reputation,
            tier: standing.tier,
            progress: standing.progress,
            next_tier: standing.next_tier,
            points_to_next: standing.points_to_next,
        })
    }

    /// Most recent entries first.
    pub async fn history(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.load_user(user_id).await?;
        let mut entries = self.load_entries(user_id).await?;
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    /// Verify the ledger against the stored total and re-derive the tier from the schedule.
    pub async fn reconcile(&self, user_id: &UserId) -> Result<ReconcileReport, LedgerError> {
        let user = self.load_user(user_id).await?;
        let entries = self.load_entries(user_id).await?;

        let mut running: i64 = 0;
        for entry in &entries {
            running += entry.amount;
            if running != entry.balance_after as i64 {
                error!(
                    %user_id,
                    entry_id = %entry.id,
                    running,
                    balance_after = entry.balance_after,
                    "ledger balance snapshot diverges from running total"
                );
                return Err(LedgerError::ConsistencyViolation {
                    user_id: user_id.clone(),
                    ledger_sum: running,
                    stored: entry.balance_after,
                });
            }
        }

        if running != user.reputation as i64 {
            error!(
                %user_id,
                ledger_sum = running,
                stored = user.reputation,
                "ledger sum diverges from stored reputation"
            );
            return Err(LedgerError::ConsistencyViolation {
                user_id: user_id.clone(),
                ledger_sum: running,
                stored: user.reputation,
            });
        }

        let expected_tier = self.config.breakpoints.tier_for(user.reputation);
        let tier_corrected = expected_tier != user.tier;
        if tier_corrected {
            let mut corrected = user.clone();
            corrected.tier = expected_tier;
            let store = Arc::clone(&self.store);
            let version = user.version;
            let updated =
                with_deadline(self.storage.timeout, move || store.update_user(corrected, version))
                    .await?;
            info!(%user_id, from = %user.tier, to = %updated.tier, "stored tier re-derived");
            publish_best_effort(
                self.events.as_ref(),
                DomainEvent::TierChanged {
                    user_id: user_id.clone(),
                    from: user.tier,
                    to: updated.tier,
                },
            );
        }

        Ok(ReconcileReport {
            user_id: user_id.clone(),
            entries: entries.len(),
            ledger_sum: running,
            tier: expected_tier,
            tier_corrected,
        })
    }

    async fn load_user(&self, user_id: &UserId) -> Result<User, LedgerError> {
        let store = Arc::clone(&self.store);
        let id = user_id.clone();
        with_deadline(self.storage.timeout, move || store.fetch_user(&id))
            .await?
            .ok_or_else(|| LedgerError::NotFound(user_id.clone()))
    }

    async fn load_entries(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let store = Arc::clone(&self.store);
        let id = user_id.clone();
        Ok(with_deadline(self.storage.timeout, move || store.entries_for(&id)).await?)
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.config.backoff.saturating_mul(1 << shift)
    }

    fn announce(&self, before: &User, after: &User, entry: &LedgerEntry) {
        publish_best_effort(
            self.events.as_ref(),
            DomainEvent::ReputationChanged {
                user_id: entry.user_id.clone(),
                amount: entry.amount,
                reason: entry.reason.clone(),
                balance_after: entry.balance_after,
            },
        );

        if before.tier != after.tier {
            info!(user_id = %after.id, from = %before.tier, to = %after.tier, "tier changed");
            publish_best_effort(
                self.events.as_ref(),
                DomainEvent::TierChanged {
                    user_id: after.id.clone(),
                    from: before.tier,
                    to: after.tier,
                },
            );
        }
    }
}

fn validate_delta(amount: i64, reason: &str) -> Result<String, LedgerValidation> {
    if amount == 0 {
        return Err(LedgerValidation::ZeroAmount);
    }
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(LedgerValidation::BlankReason);
    }
    Ok(reason.to_string())
}

fn apply_delta(current: u64, amount: i64) -> Result<u64, LedgerValidation> {
    if amount >= 0 {
        current
            .checked_add(amount as u64)
            .ok_or(LedgerValidation::Overflow { current, amount })
    } else {
        current
            .checked_sub(amount.unsigned_abs())
            .ok_or(LedgerValidation::NegativeBalance { current, amount })
    }
}

/// Input rejected before any state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerValidation {
    #[error("reputation delta must be non-zero")]
    ZeroAmount,
    #[error("reputation delta requires a reason")]
    BlankReason,
    #[error("delta {amount} would take reputation {current} below zero")]
    NegativeBalance { current: u64, amount: i64 },
    #[error("delta {amount} overflows reputation {current}")]
    Overflow { current: u64, amount: i64 },
    #[error("user {0} is banned")]
    UserBanned(UserId),
}

/// Error raised by the reputation ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] LedgerValidation),
    #[error("user {0} not found")]
    NotFound(UserId),
    #[error("reputation update for {user_id} conflicted {attempts} time(s)")]
    ConcurrencyConflict { user_id: UserId, attempts: u32 },
    #[error("ledger sum {ledger_sum} for {user_id} diverges from stored total {stored}")]
    ConsistencyViolation {
        user_id: UserId,
        ledger_sum: i64,
        stored: u64,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
