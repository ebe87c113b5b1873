use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::RepositoryError;
use crate::identity::{ApplicationId, OpportunityId, QuoteId, QuoteRequestId, UserId};
use crate::opportunities::{
    Application, ApplicationCounts, ApplicationRepository, ApplicationStatus, Opportunity,
    OpportunityRepository, OpportunityStats, OpportunityStatus,
};
use crate::quotes::{Quote, QuoteRepository, QuoteRequest, QuoteRequestStatus, QuoteStatus};
use crate::reputation::{LedgerCommit, LedgerEntry, LedgerRepository};
use crate::users::{User, UserRepository};

#[derive(Debug, Default)]
struct StoreState {
    users: HashMap<UserId, User>,
    ledger: HashMap<UserId, Vec<LedgerEntry>>,
    opportunities: HashMap<OpportunityId, Opportunity>,
    applications: HashMap<ApplicationId, Application>,
    quote_requests: HashMap<QuoteRequestId, QuoteRequest>,
    /// Submission order.
    quotes: Vec<Quote>,
}

/// Process-local store implementing every repository trait behind one lock, so each trait
/// method is atomic with respect to the others.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }
}

impl UserRepository for InMemoryStore {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut state = self.state()?;
        if state.users.contains_key(&user.id)
            || state.users.values().any(|existing| existing.email == user.email)
        {
            return Err(RepositoryError::Conflict);
        }
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.state()?.users.get(id).cloned())
    }

    fn update_user(&self, mut user: User, expected_version: u64) -> Result<User, RepositoryError> {
        let mut state = self.state()?;
        let stored = state.users.get_mut(&user.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::VersionMismatch {
                expected: expected_version,
                found: stored.version,
            });
        }
        user.version = expected_version + 1;
        *stored = user.clone();
        Ok(user)
    }
}

impl LedgerRepository for InMemoryStore {
    fn commit_entry(&self, commit: LedgerCommit) -> Result<(LedgerEntry, User), RepositoryError> {
        let mut state = self.state()?;
        let user = state
            .users
            .get_mut(&commit.user_id)
            .ok_or(RepositoryError::NotFound)?;
        if user.version != commit.expected_version {
            return Err(RepositoryError::VersionMismatch {
                expected: commit.expected_version,
                found: user.version,
            });
        }

        user.reputation = commit.balance_after;
        user.tier = commit.tier;
        user.version += 1;
        let user = user.clone();

        let entry = commit.into_entry();
        state
            .ledger
            .entry(entry.user_id.clone())
            .or_default()
            .push(entry.clone());
        Ok((entry, user))
    }

    fn entries_for(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>, RepositoryError> {
        Ok(self
            .state()?
            .ledger
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl OpportunityRepository for InMemoryStore {
    fn insert_opportunity(&self, opportunity: Opportunity) -> Result<Opportunity, RepositoryError> {
        let mut state = self.state()?;
        if state.opportunities.contains_key(&opportunity.id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .opportunities
            .insert(opportunity.id.clone(), opportunity.clone());
        Ok(opportunity)
    }

    fn fetch_opportunity(&self, id: &OpportunityId) -> Result<Option<Opportunity>, RepositoryError> {
        Ok(self.state()?.opportunities.get(id).cloned())
    }

    fn update_opportunity(&self, mut opportunity: Opportunity) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let stored = state
            .opportunities
            .get_mut(&opportunity.id)
            .ok_or(RepositoryError::NotFound)?;
        opportunity.stats = stored.stats;
        *stored = opportunity;
        Ok(())
    }

    fn active_opportunities(&self) -> Result<Vec<Opportunity>, RepositoryError> {
        Ok(self
            .state()?
            .opportunities
            .values()
            .filter(|opportunity| opportunity.status == OpportunityStatus::Active)
            .cloned()
            .collect())
    }

    fn write_application_counts(
        &self,
        id: &OpportunityId,
        counts: ApplicationCounts,
    ) -> Result<OpportunityStats, RepositoryError> {
        let mut state = self.state()?;
        let stored = state
            .opportunities
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        stored.stats.applications = counts.applications;
        stored.stats.shortlisted = counts.shortlisted;
        stored.stats.hired = counts.hired;
        Ok(stored.stats)
    }

    fn increment_views(&self, id: &OpportunityId) -> Result<OpportunityStats, RepositoryError> {
        let mut state = self.state()?;
        let stored = state
            .opportunities
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        stored.stats.views = stored.stats.views.saturating_add(1);
        Ok(stored.stats)
    }
}

impl ApplicationRepository for InMemoryStore {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut state = self.state()?;
        let duplicate = state.applications.contains_key(&application.id)
            || state.applications.values().any(|existing| {
                existing.opportunity_id == application.opportunity_id
                    && existing.applicant_id == application.applicant_id
            });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        state
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self.state()?.applications.get(id).cloned())
    }

    fn update_application(
        &self,
        application: Application,
        expected: ApplicationStatus,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let stored = state
            .applications
            .get_mut(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::StaleStatus {
                expected: expected.label(),
                found: stored.status.label(),
            });
        }
        *stored = application;
        Ok(())
    }

    fn statuses_for(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<ApplicationStatus>, RepositoryError> {
        Ok(self
            .state()?
            .applications
            .values()
            .filter(|application| &application.opportunity_id == opportunity_id)
            .map(|application| application.status)
            .collect())
    }
}

impl QuoteRepository for InMemoryStore {
    fn insert_request(&self, request: QuoteRequest) -> Result<QuoteRequest, RepositoryError> {
        let mut state = self.state()?;
        if state.quote_requests.contains_key(&request.id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .quote_requests
            .insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn fetch_request(&self, id: &QuoteRequestId) -> Result<Option<QuoteRequest>, RepositoryError> {
        Ok(self.state()?.quote_requests.get(id).cloned())
    }

    fn insert_quote(&self, quote: Quote) -> Result<Quote, RepositoryError> {
        let mut state = self.state()?;
        let duplicate = state.quotes.iter().any(|existing| {
            existing.id == quote.id
                || (existing.request_id == quote.request_id
                    && existing.provider_id == quote.provider_id)
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        let request = state
            .quote_requests
            .get_mut(&quote.request_id)
            .ok_or(RepositoryError::NotFound)?;
        request.quotes_received = request.quotes_received.saturating_add(1);
        state.quotes.push(quote.clone());
        Ok(quote)
    }

    fn fetch_quote(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        Ok(self
            .state()?
            .quotes
            .iter()
            .find(|quote| &quote.id == id)
            .cloned())
    }

    fn transition_quote(
        &self,
        id: &QuoteId,
        expected: QuoteStatus,
        next: QuoteStatus,
    ) -> Result<Quote, RepositoryError> {
        let mut state = self.state()?;
        let stored = state
            .quotes
            .iter_mut()
            .find(|quote| &quote.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::StaleStatus {
                expected: expected.label(),
                found: stored.status.label(),
            });
        }
        stored.status = next;
        Ok(stored.clone())
    }

    fn award_quote(
        &self,
        id: &QuoteId,
        expected: QuoteStatus,
    ) -> Result<(Quote, QuoteRequest), RepositoryError> {
        let mut state = self.state()?;
        let StoreState {
            quotes,
            quote_requests,
            ..
        } = &mut *state;

        let quote = quotes
            .iter_mut()
            .find(|quote| &quote.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if quote.status != expected {
            return Err(RepositoryError::StaleStatus {
                expected: expected.label(),
                found: quote.status.label(),
            });
        }
        let request = quote_requests
            .get_mut(&quote.request_id)
            .ok_or(RepositoryError::NotFound)?;
        if !request.status.can_award() {
            return Err(RepositoryError::StaleStatus {
                expected: QuoteRequestStatus::Open.label(),
                found: request.status.label(),
            });
        }

        quote.status = QuoteStatus::Accepted;
        request.status = QuoteRequestStatus::Awarded;
        request.selected_quote = Some(quote.id.clone());
        Ok((quote.clone(), request.clone()))
    }

    fn write_match_score(&self, id: &QuoteId, score: u8) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let stored = state
            .quotes
            .iter_mut()
            .find(|quote| &quote.id == id)
            .ok_or(RepositoryError::NotFound)?;
        stored.match_score = score;
        Ok(())
    }

    fn quotes_for(&self, request_id: &QuoteRequestId) -> Result<Vec<Quote>, RepositoryError> {
        Ok(self
            .state()?
            .quotes
            .iter()
            .filter(|quote| &quote.request_id == request_id)
            .cloned()
            .collect())
    }
}
