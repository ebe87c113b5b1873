//! Opportunities, applications, the eligibility gate, and the denormalized applicant counters.

pub mod domain;
pub mod eligibility;
pub mod repository;
pub mod router;
pub mod service;
pub mod stats;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationDraft, ApplicationSettings, ApplicationStatus, Opportunity,
    OpportunityDraft, OpportunityStats, OpportunityStatus, Platform,
};
pub use eligibility::{can_apply, check_eligibility, IneligibleReason};
pub use repository::{ApplicationRepository, OpportunityRepository};
pub use router::opportunity_router;
pub use service::{
    ApplicationService, ApplicationServiceError, ApplicationValidation, EligibilityView,
};
pub use stats::{tally, ApplicationCounts, StatsAggregator};
