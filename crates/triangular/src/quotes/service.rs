use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::domain::{
    Pricing, Quote, QuoteDraft, QuoteRequest, QuoteRequestDraft, QuoteRequestStatus, QuoteStatus,
};
use super::repository::QuoteRepository;
use super::scoring::{match_breakdown, match_score, MatchBreakdown, ScoringError};
use crate::config::StorageConfig;
use crate::identity::{Caller, QuoteId, QuoteRequestId, UserId};
use crate::store::{with_deadline, RepositoryError};
use crate::users::{User, UserRepository};

/// Service covering quote request intake, provider quotes, ranking and awarding.
pub struct QuoteService<S> {
    store: Arc<S>,
    storage: StorageConfig,
}

impl<S> QuoteService<S>
where
    S: UserRepository + QuoteRepository + 'static,
{
    pub fn new(store: Arc<S>, storage: StorageConfig) -> Self {
        Self { store, storage }
    }

    pub async fn open_request(
        &self,
        requester_id: &UserId,
        draft: QuoteRequestDraft,
    ) -> Result<QuoteRequest, QuoteServiceError> {
        validate_request_draft(&draft)?;
        let requester = self.load_user(requester_id).await?;
        if requester.is_banned {
            return Err(QuoteValidation::UserBanned.into());
        }

        let request = QuoteRequest::from_draft(requester.id, draft);
        let store = Arc::clone(&self.store);
        let stored = with_deadline(self.storage.timeout, move || store.insert_request(request))
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => QuoteServiceError::Duplicate,
                other => other.into(),
            })?;

        info!(request_id = %stored.id, category = %stored.category, "quote request opened");
        Ok(stored)
    }

    /// Submit a provider's quote. The stored quote carries the match score computed at
    /// submission time.
    pub async fn submit_quote(
        &self,
        request_id: &QuoteRequestId,
        provider_id: &UserId,
        draft: QuoteDraft,
    ) -> Result<Quote, QuoteServiceError> {
        validate_quote_draft(&draft)?;
        let request = self.load_request(request_id).await?;
        if !request.status.accepts_quotes() || request.is_expired(Utc::now()) {
            return Err(QuoteServiceError::RequestClosed {
                status: request.status,
            });
        }

        let provider = self.load_user(provider_id).await?;
        if provider.is_banned {
            return Err(QuoteValidation::UserBanned.into());
        }
        if !provider.platforms.quotify || !provider.quotify.is_provider {
            return Err(QuoteValidation::NotAProvider.into());
        }
        if provider.id == request.requester {
            return Err(QuoteValidation::OwnRequest.into());
        }

        let score = match_score(&request, &provider)?;
        let quote = Quote {
            id: QuoteId::generate(),
            request_id: request.id.clone(),
            provider_id: provider.id.clone(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            pricing: draft.pricing,
            status: QuoteStatus::Pending,
            match_score: score,
            submitted_at: Utc::now(),
        };

        let store = Arc::clone(&self.store);
        let stored = with_deadline(self.storage.timeout, move || store.insert_quote(quote))
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => QuoteServiceError::Duplicate,
                RepositoryError::NotFound => QuoteServiceError::NotFound {
                    entity: "quote request",
                    id: request_id.to_string(),
                },
                other => other.into(),
            })?;

        info!(
            quote_id = %stored.id,
            request_id = %stored.request_id,
            provider_id = %stored.provider_id,
            match_score = stored.match_score,
            "quote submitted"
        );
        Ok(stored)
    }

    /// Quotes for a request, best match first. Equal scores keep submission order.
    pub async fn rank_quotes(
        &self,
        request_id: &QuoteRequestId,
    ) -> Result<Vec<Quote>, QuoteServiceError> {
        self.load_request(request_id).await?;
        let mut quotes = self.load_quotes(request_id).await?;
        rank(&mut quotes);
        Ok(quotes)
    }

    /// Recompute every quote's score against current provider data and persist the changes.
    pub async fn rescore(
        &self,
        request_id: &QuoteRequestId,
    ) -> Result<Vec<Quote>, QuoteServiceError> {
        let request = self.load_request(request_id).await?;
        let mut quotes = self.load_quotes(request_id).await?;

        let mut changed = 0usize;
        for quote in quotes.iter_mut() {
            let provider = match self.fetch_user(&quote.provider_id).await? {
                Some(provider) => provider,
                None => {
                    warn!(quote_id = %quote.id, provider_id = %quote.provider_id, "provider missing, score kept");
                    continue;
                }
            };
            let score = match_score(&request, &provider)?;
            if score != quote.match_score {
                quote.match_score = score;
                let store = Arc::clone(&self.store);
                let id = quote.id.clone();
                with_deadline(self.storage.timeout, move || store.write_match_score(&id, score))
                    .await?;
                changed += 1;
            }
        }

        debug!(%request_id, quotes = quotes.len(), changed, "quotes rescored");
        rank(&mut quotes);
        Ok(quotes)
    }

    /// Component view of a stored quote's score against current data.
    pub async fn breakdown(&self, quote_id: &QuoteId) -> Result<MatchBreakdown, QuoteServiceError> {
        let quote = self.load_quote(quote_id).await?;
        let request = self.load_request(&quote.request_id).await?;
        let provider = self.load_user(&quote.provider_id).await?;
        Ok(match_breakdown(&request, &provider)?)
    }

    /// Move a quote along its lifecycle. Withdrawal belongs to the provider; viewing, accepting
    /// and rejecting belong to the requester. Accepting awards the parent request in the same write,
    /// so at most one quote per request is ever accepted.
    pub async fn update_quote_status(
        &self,
        actor: &Caller,
        quote_id: &QuoteId,
        next: QuoteStatus,
    ) -> Result<Quote, QuoteServiceError> {
        let quote = self.load_quote(quote_id).await?;
        let request = self.load_request(&quote.request_id).await?;

        let permitted = actor.is_admin()
            || if next == QuoteStatus::Withdrawn {
                actor.user_id == quote.provider_id
            } else {
                actor.user_id == request.requester
            };
        if !permitted {
            return Err(QuoteServiceError::Forbidden);
        }

        let previous = quote.status;
        if !previous.can_transition_to(next) {
            return Err(QuoteServiceError::InvalidTransition {
                from: previous,
                to: next,
            });
        }
        if next == QuoteStatus::Accepted && !request.status.can_award() {
            return Err(QuoteServiceError::RequestClosed {
                status: request.status,
            });
        }

        let store = Arc::clone(&self.store);
        let id = quote.id.clone();
        let written = if next == QuoteStatus::Accepted {
            with_deadline(self.storage.timeout, move || store.award_quote(&id, previous))
                .await
                .map(|(accepted, awarded)| {
                    info!(request_id = %awarded.id, quote_id = %accepted.id, "quote request awarded");
                    accepted
                })
        } else {
            with_deadline(self.storage.timeout, move || {
                store.transition_quote(&id, previous, next)
            })
            .await
        };

        match written {
            Ok(updated) => {
                debug!(
                    quote_id = %updated.id,
                    from = previous.label(),
                    to = next.label(),
                    "quote status changed"
                );
                Ok(updated)
            }
            Err(RepositoryError::StaleStatus { .. }) => {
                let current = self.load_quote(quote_id).await?;
                warn!(
                    %quote_id,
                    from = previous.label(),
                    found = current.status.label(),
                    "quote status write lost a race"
                );
                if current.status == previous {
                    let request = self.load_request(&current.request_id).await?;
                    return Err(QuoteServiceError::RequestClosed {
                        status: request.status,
                    });
                }
                Err(QuoteServiceError::InvalidTransition {
                    from: current.status,
                    to: next,
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    pub async fn request(
        &self,
        request_id: &QuoteRequestId,
    ) -> Result<QuoteRequest, QuoteServiceError> {
        self.load_request(request_id).await
    }

    async fn load_request(
        &self,
        request_id: &QuoteRequestId,
    ) -> Result<QuoteRequest, QuoteServiceError> {
        let store = Arc::clone(&self.store);
        let id = request_id.clone();
        with_deadline(self.storage.timeout, move || store.fetch_request(&id))
            .await?
            .ok_or_else(|| QuoteServiceError::NotFound {
                entity: "quote request",
                id: request_id.to_string(),
            })
    }

    async fn load_quote(&self, quote_id: &QuoteId) -> Result<Quote, QuoteServiceError> {
        let store = Arc::clone(&self.store);
        let id = quote_id.clone();
        with_deadline(self.storage.timeout, move || store.fetch_quote(&id))
            .await?
            .ok_or_else(|| QuoteServiceError::NotFound {
                entity: "quote",
                id: quote_id.to_string(),
            })
    }

    async fn load_quotes(
        &self,
        request_id: &QuoteRequestId,
    ) -> Result<Vec<Quote>, QuoteServiceError> {
        let store = Arc::clone(&self.store);
        let id = request_id.clone();
        Ok(with_deadline(self.storage.timeout, move || store.quotes_for(&id)).await?)
    }

    async fn fetch_user(&self, user_id: &UserId) -> Result<Option<User>, QuoteServiceError> {
        let store = Arc::clone(&self.store);
        let id = user_id.clone();
        Ok(with_deadline(self.storage.timeout, move || store.fetch_user(&id)).await?)
    }

    async fn load_user(&self, user_id: &UserId) -> Result<User, QuoteServiceError> {
        self.fetch_user(user_id)
            .await?
            .ok_or_else(|| QuoteServiceError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })
    }
}

/// Stable sort, so ties keep the order `quotes_for` returned.
fn rank(quotes: &mut [Quote]) {
    quotes.sort_by(|left, right| right.match_score.cmp(&left.match_score));
}

fn validate_request_draft(draft: &QuoteRequestDraft) -> Result<(), QuoteValidation> {
    if draft.title.trim().is_empty() {
        return Err(QuoteValidation::BlankTitle);
    }
    if draft.category.trim().is_empty() {
        return Err(QuoteValidation::BlankCategory);
    }
    if let Some(index) = draft
        .requirements
        .skills
        .iter()
        .position(|skill| skill.trim().is_empty())
    {
        return Err(ScoringError::BlankSkill { index }.into());
    }
    if let (Some(min), Some(max)) = (draft.budget.min, draft.budget.max) {
        if min > max {
            return Err(QuoteValidation::InvertedBudget { min, max });
        }
    }
    Ok(())
}

fn validate_quote_draft(draft: &QuoteDraft) -> Result<(), QuoteValidation> {
    if draft.title.trim().is_empty() {
        return Err(QuoteValidation::BlankTitle);
    }
    validate_pricing(&draft.pricing)
}

fn validate_pricing(pricing: &Pricing) -> Result<(), QuoteValidation> {
    if !pricing.amount.is_finite() || pricing.amount < 0.0 {
        return Err(QuoteValidation::InvalidAmount(pricing.amount));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuoteValidation {
    #[error("title is required")]
    BlankTitle,
    #[error("category is required")]
    BlankCategory,
    #[error("budget minimum {min} exceeds maximum {max}")]
    InvertedBudget { min: f64, max: f64 },
    #[error("quote amount {0} must be a non-negative number")]
    InvalidAmount(f64),
    #[error("user is not an enabled quote provider")]
    NotAProvider,
    #[error("providers cannot quote on their own request")]
    OwnRequest,
    #[error("banned users cannot take part in quoting")]
    UserBanned,
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// Error raised by the quote service.
#[derive(Debug, thiserror::Error)]
pub enum QuoteServiceError {
    #[error(transparent)]
    Validation(#[from] QuoteValidation),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("quote request is {} and no longer accepts this change", .status.label())]
    RequestClosed { status: QuoteRequestStatus },
    #[error("cannot move quote from {} to {}", .from.label(), .to.label())]
    InvalidTransition { from: QuoteStatus, to: QuoteStatus },
    #[error("provider already quoted on this request")]
    Duplicate,
    #[error("caller may not perform this transition")]
    Forbidden,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<ScoringError> for QuoteServiceError {
    fn from(error: ScoringError) -> Self {
        QuoteServiceError::Validation(error.into())
    }
}
