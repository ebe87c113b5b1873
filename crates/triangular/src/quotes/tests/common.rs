use std::sync::Arc;
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;

use crate::config::StorageConfig;
use crate::identity::{QuoteId, QuoteRequestId, UserId};
use crate::quotes::{
    Pricing, PricingKind, Quote, QuoteDraft, QuoteRepository, QuoteRequest, QuoteRequestDraft,
    QuoteRequirements, QuoteService, QuoteStatus,
};
use crate::store::{InMemoryStore, RepositoryError};
use crate::tiers::Tier;
use crate::users::{User, UserRepository, UserType};

pub(super) fn build_service() -> (Arc<QuoteService<InMemoryStore>>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let service = QuoteService::new(Arc::clone(&store), StorageConfig::default());
    (Arc::new(service), store)
}

pub(super) fn requester(store: &InMemoryStore, id: &str) -> UserId {
    let user = User::new(
        UserId::from(id),
        "Anand Traders",
        format!("{id}@example.com"),
        UserType::Business,
    );
    store.insert_user(user).expect("seed requester").id
}

pub(super) fn provider(
    store: &InMemoryStore,
    id: &str,
    services: &[&str],
    tier: Tier,
    rating: f64,
) -> UserId {
    let mut user = User::new(
        UserId::from(id),
        "Studio",
        format!("{id}@example.com"),
        UserType::Contributor,
    );
    user.tier = tier;
    user.quotify.is_provider = true;
    user.quotify.provider.services = services.iter().map(|s| s.to_string()).collect();
    user.quotify.provider.rating = rating;
    store.insert_user(user).expect("seed provider").id
}

pub(super) fn request_draft(skills: &[&str], min_tier: Option<Tier>) -> QuoteRequestDraft {
    QuoteRequestDraft {
        title: "Catalogue site".to_string(),
        category: "Web Development".to_string(),
        requirements: QuoteRequirements {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience: None,
            min_tier,
        },
        budget: Default::default(),
        deadline: None,
    }
}

pub(super) fn quote_draft(amount: f64) -> QuoteDraft {
    QuoteDraft {
        title: "Fixed-price build".to_string(),
        description: "Two sprints".to_string(),
        pricing: Pricing {
            amount,
            currency: "INR".to_string(),
            kind: PricingKind::Fixed,
        },
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Delegates to an [`InMemoryStore`] but holds each quote read for `stall` after taking the
/// snapshot, so concurrent status writers act on the same stale view.
pub(super) struct StalledQuoteStore {
    pub(super) inner: InMemoryStore,
    pub(super) stall: Duration,
}

impl UserRepository for StalledQuoteStore {
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

impl QuoteRepository for StalledQuoteStore {
    fn insert_request(&self, request: QuoteRequest) -> Result<QuoteRequest, RepositoryError> {
        self.inner.insert_request(request)
    }

    fn fetch_request(&self, id: &QuoteRequestId) -> Result<Option<QuoteRequest>, RepositoryError> {
        self.inner.fetch_request(id)
    }

    fn insert_quote(&self, quote: Quote) -> Result<Quote, RepositoryError> {
        self.inner.insert_quote(quote)
    }

    fn fetch_quote(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let snapshot = self.inner.fetch_quote(id);
        std::thread::sleep(self.stall);
        snapshot
    }

    fn transition_quote(
        &self,
        id: &QuoteId,
        expected: QuoteStatus,
        next: QuoteStatus,
    ) -> Result<Quote, RepositoryError> {
        self.inner.transition_quote(id, expected, next)
    }

    fn award_quote(
        &self,
        id: &QuoteId,
        expected: QuoteStatus,
    ) -> Result<(Quote, QuoteRequest), RepositoryError> {
        self.inner.award_quote(id, expected)
    }

    fn write_match_score(&self, id: &QuoteId, score: u8) -> Result<(), RepositoryError> {
        self.inner.write_match_score(id, score)
    }

    fn quotes_for(&self, request_id: &QuoteRequestId) -> Result<Vec<Quote>, RepositoryError> {
        self.inner.quotes_for(request_id)
    }
}
