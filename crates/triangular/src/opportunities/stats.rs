use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{ApplicationStatus, OpportunityStats};
use super::repository::{ApplicationRepository, OpportunityRepository};
use crate::config::StorageConfig;
use crate::identity::OpportunityId;
use crate::store::{with_deadline, RepositoryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApplicationCounts {
    pub applications: u32,
    pub shortlisted: u32,
    pub hired: u32,
}

/// Full recount over the statuses of one opportunity's applications.
pub fn tally(statuses: &[ApplicationStatus]) -> ApplicationCounts {
    statuses
        .iter()
        .fold(ApplicationCounts::default(), |mut counts, status| {
            counts.applications += 1;
            if status.counts_as_shortlisted() {
                counts.shortlisted += 1;
            }
            if *status == ApplicationStatus::Accepted {
                counts.hired += 1;
            }
            counts
        })
}

/// Recomputes denormalized counters after every application write. Each run is a full recount,
/// so concurrent runs converge on the same values.
pub struct StatsAggregator<S> {
    store: Arc<S>,
    storage: StorageConfig,
}

impl<S> StatsAggregator<S>
where
    S: OpportunityRepository + ApplicationRepository + 'static,
{
    pub fn new(store: Arc<S>, storage: StorageConfig) -> Self {
        Self { store, storage }
    }

    pub async fn recompute(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<OpportunityStats, RepositoryError> {
        let store = Arc::clone(&self.store);
        let id = opportunity_id.clone();
        let stats = with_deadline(self.storage.timeout, move || {
            let counts = tally(&store.statuses_for(&id)?);
            store.write_application_counts(&id, counts)
        })
        .await?;

        debug!(
            %opportunity_id,
            applications = stats.applications,
            shortlisted = stats.shortlisted,
            hired = stats.hired,
            "opportunity stats recounted"
        );
        Ok(stats)
    }
}
