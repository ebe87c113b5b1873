use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{LedgerEntryId, UserId};
use crate::tiers::Tier;

/// Immutable ledger record. `balance_after` is the owner's running total at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub user_id: UserId,
    pub amount: i64,
    pub reason: String,
    pub balance_after: u64,
    pub created_at: DateTime<Utc>,
}

/// Unit of work handed to the repository: one entry plus the user fields it implies, applied
/// only if the user is still at `expected_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCommit {
    pub user_id: UserId,
    pub expected_version: u64,
    pub amount: i64,
    pub reason: String,
    pub balance_after: u64,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
}

impl LedgerCommit {
    pub fn into_entry(self) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::generate(),
            user_id: self.user_id,
            amount: self.amount,
            reason: self.reason,
            balance_after: self.balance_after,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReputationStanding {
    pub user_id: UserId,
    pub reputation: u64,
    pub tier: Tier,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_to_next: Option<u64>,
    pub can_graduate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub user_id: UserId,
    pub entries: usize,
    pub ledger_sum: i64,
    pub tier: Tier,
    pub tier_corrected: bool,
}
