use super::domain::{LedgerCommit, LedgerEntry};
use crate::identity::UserId;
use crate::store::RepositoryError;
use crate::users::User;

/// Ledger persistence. `commit_entry` is the single atomic write path for reputation.
pub trait LedgerRepository: Send + Sync {
    /// Append the entry and set the user's reputation, tier and version together. Fails with
    /// `VersionMismatch` when the user moved past `commit.expected_version`, and `NotFound` when
    /// the user does not exist; neither failure leaves a partial write behind.
    fn commit_entry(&self, commit: LedgerCommit) -> Result<(LedgerEntry, User), RepositoryError>;
    /// Entries for a user in commit order.
    fn entries_for(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>, RepositoryError>;
}
