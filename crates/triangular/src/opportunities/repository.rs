use super::domain::{Application, ApplicationStatus, Opportunity, OpportunityStats};
use super::stats::ApplicationCounts;
use crate::identity::{ApplicationId, OpportunityId};
use crate::store::RepositoryError;

/// Storage abstraction for opportunities.
pub trait OpportunityRepository: Send + Sync {
    fn insert_opportunity(&self, opportunity: Opportunity) -> Result<Opportunity, RepositoryError>;
    fn fetch_opportunity(&self, id: &OpportunityId) -> Result<Option<Opportunity>, RepositoryError>;
    /// Replace everything except `stats`, which belong to the counter writers below.
    fn update_opportunity(&self, opportunity: Opportunity) -> Result<(), RepositoryError>;
    fn active_opportunities(&self) -> Result<Vec<Opportunity>, RepositoryError>;
    /// Overwrite the application counters, leaving `views` untouched.
    fn write_application_counts(
        &self,
        id: &OpportunityId,
        counts: ApplicationCounts,
    ) -> Result<OpportunityStats, RepositoryError>;
    fn increment_views(&self, id: &OpportunityId) -> Result<OpportunityStats, RepositoryError>;
}

/// Storage abstraction for applications. `insert_application` refuses a second application for
/// the same (opportunity, applicant) pair with `Conflict`.
pub trait ApplicationRepository: Send + Sync {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError>;
    fn fetch_application(&self, id: &ApplicationId)
        -> Result<Option<Application>, RepositoryError>;
    /// Replace the application only while its stored status is still `expected`; a concurrent
    /// transition makes this fail with `StaleStatus` and leaves the record untouched.
    fn update_application(
        &self,
        application: Application,
        expected: ApplicationStatus,
    ) -> Result<(), RepositoryError>;
    /// Current status of every application for the opportunity.
    fn statuses_for(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<ApplicationStatus>, RepositoryError>;
}
