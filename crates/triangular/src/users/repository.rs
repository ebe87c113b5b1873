use super::domain::User;
use crate::identity::UserId;
use crate::store::RepositoryError;

/// Storage abstraction for user aggregates.
pub trait UserRepository: Send + Sync {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError>;
    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    /// Replace the stored user if `expected_version` is still current. The stored version is
    /// bumped, so a concurrent ledger commit against the old version is refused.
    fn update_user(&self, user: User, expected_version: u64) -> Result<User, RepositoryError>;
}
