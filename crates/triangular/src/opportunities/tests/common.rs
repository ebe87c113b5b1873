use std::sync::Arc;
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;

use crate::config::StorageConfig;
use crate::events::InMemoryEventLog;
use crate::identity::{ApplicationId, OpportunityId, UserId};
use crate::opportunities::{
    Application, ApplicationCounts, ApplicationDraft, ApplicationRepository, ApplicationService,
    ApplicationStatus, Opportunity, OpportunityRepository, OpportunityStats, Platform,
};
use crate::store::{InMemoryStore, RepositoryError};
use crate::tiers::Tier;
use crate::users::{User, UserRepository, UserType};

pub(super) type MemoryService = ApplicationService<InMemoryStore, InMemoryEventLog>;

pub(super) fn build_service() -> (Arc<MemoryService>, Arc<InMemoryStore>, Arc<InMemoryEventLog>) {
    let store = Arc::new(InMemoryStore::new());
    let events = Arc::new(InMemoryEventLog::default());
    let service =
        ApplicationService::new(Arc::clone(&store), Arc::clone(&events), StorageConfig::default());
    (Arc::new(service), store, events)
}

pub(super) fn person(id: &str, tier: Tier) -> User {
    let mut user = User::new(
        UserId::from(id),
        "Nisha",
        format!("{id}@example.com"),
        UserType::Student,
    );
    user.tier = tier;
    user
}

pub(super) fn seed_user(store: &InMemoryStore, user: User) -> UserId {
    store.insert_user(user).expect("seed user").id
}

pub(super) fn listing(id: &str, poster: &UserId, min_tier: Tier) -> Opportunity {
    let mut opportunity = Opportunity::new(
        OpportunityId::from(id),
        poster.clone(),
        "Backend internship",
        Platform::HuseCircle,
    );
    opportunity.min_tier = min_tier;
    opportunity
}

pub(super) fn seed_opportunity(store: &InMemoryStore, opportunity: Opportunity) -> OpportunityId {
    store
        .insert_opportunity(opportunity)
        .expect("seed opportunity")
        .id
}

pub(super) fn draft() -> ApplicationDraft {
    ApplicationDraft {
        cover_letter: "I have shipped two axum services.".to_string(),
        resume_url: Some("https://files.example.com/cv.pdf".to_string()),
        portfolio_url: None,
    }
}

pub(super) fn stats_of(store: &InMemoryStore, id: &OpportunityId) -> OpportunityStats {
    store
        .fetch_opportunity(id)
        .expect("fetch opportunity")
        .expect("opportunity present")
        .stats
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl UserRepository for UnavailableStore {
    fn insert_user(&self, _user: User) -> Result<User, RepositoryError> {
        offline()
    }

    fn fetch_user(&self, _id: &UserId) -> Result<Option<User>, RepositoryError> {
        offline()
    }

    fn update_user(&self, _user: User, _expected_version: u64) -> Result<User, RepositoryError> {
        offline()
    }
}

impl OpportunityRepository for UnavailableStore {
    fn insert_opportunity(&self, _opportunity: Opportunity) -> Result<Opportunity, RepositoryError> {
        offline()
    }

    fn fetch_opportunity(&self, _id: &OpportunityId) -> Result<Option<Opportunity>, RepositoryError> {
        offline()
    }

    fn update_opportunity(&self, _opportunity: Opportunity) -> Result<(), RepositoryError> {
        offline()
    }

    fn active_opportunities(&self) -> Result<Vec<Opportunity>, RepositoryError> {
        offline()
    }

    fn write_application_counts(
        &self,
        _id: &OpportunityId,
        _counts: ApplicationCounts,
    ) -> Result<OpportunityStats, RepositoryError> {
        offline()
    }

    fn increment_views(&self, _id: &OpportunityId) -> Result<OpportunityStats, RepositoryError> {
        offline()
    }
}

impl ApplicationRepository for UnavailableStore {
    fn insert_application(&self, _application: Application) -> Result<Application, RepositoryError> {
        offline()
    }

    fn fetch_application(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        offline()
    }

    fn update_application(
        &self,
        _application: Application,
        _expected: ApplicationStatus,
    ) -> Result<(), RepositoryError> {
        offline()
    }

    fn statuses_for(
        &self,
        _opportunity_id: &OpportunityId,
    ) -> Result<Vec<ApplicationStatus>, RepositoryError> {
        offline()
    }
}

/// Delegates to an [`InMemoryStore`]. Each application read is held for `stall` after taking
/// the snapshot, so concurrent writers act on the same stale status; with `counts_offline` every
/// stats write fails.
pub(super) struct FlakyStore {
    pub(super) inner: InMemoryStore,
    pub(super) stall: Duration,
    pub(super) counts_offline: bool,
}

impl UserRepository for FlakyStore {
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

impl OpportunityRepository for FlakyStore {
    fn insert_opportunity(&self, opportunity: Opportunity) -> Result<Opportunity, RepositoryError> {
        self.inner.insert_opportunity(opportunity)
    }

    fn fetch_opportunity(&self, id: &OpportunityId) -> Result<Option<Opportunity>, RepositoryError> {
        self.inner.fetch_opportunity(id)
    }

    fn update_opportunity(&self, opportunity: Opportunity) -> Result<(), RepositoryError> {
        self.inner.update_opportunity(opportunity)
    }

    fn active_opportunities(&self) -> Result<Vec<Opportunity>, RepositoryError> {
        self.inner.active_opportunities()
    }

    fn write_application_counts(
        &self,
        id: &OpportunityId,
        counts: ApplicationCounts,
    ) -> Result<OpportunityStats, RepositoryError> {
        if self.counts_offline {
            return offline();
        }
        self.inner.write_application_counts(id, counts)
    }

    fn increment_views(&self, id: &OpportunityId) -> Result<OpportunityStats, RepositoryError> {
        self.inner.increment_views(id)
    }
}

impl ApplicationRepository for FlakyStore {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        self.inner.insert_application(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let snapshot = self.inner.fetch_application(id);
        std::thread::sleep(self.stall);
        snapshot
    }

    fn update_application(
        &self,
        application: Application,
        expected: ApplicationStatus,
    ) -> Result<(), RepositoryError> {
        self.inner.update_application(application, expected)
    }

    fn statuses_for(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<ApplicationStatus>, RepositoryError> {
        self.inner.statuses_for(opportunity_id)
    }
}
