use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    Application, ApplicationDraft, ApplicationStatus, Opportunity, OpportunityStats,
};
use super::eligibility::{check_eligibility, IneligibleReason};
use super::repository::{ApplicationRepository, OpportunityRepository};
use super::stats::StatsAggregator;
use crate::config::StorageConfig;
use crate::events::{publish_best_effort, DomainEvent, EventPublisher};
use crate::identity::{ApplicationId, Caller, OpportunityId, UserId};
use crate::store::{with_deadline, RepositoryError};
use crate::users::{User, UserRepository};

/// Service composing the eligibility gate, application storage and the stats aggregator.
pub struct ApplicationService<S, E> {
    store: Arc<S>,
    events: Arc<E>,
    stats: StatsAggregator<S>,
    storage: StorageConfig,
}

/// Result of a gate evaluation for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityView {
    pub opportunity_id: OpportunityId,
    pub user_id: UserId,
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<IneligibleReason>,
}

impl<S, E> ApplicationService<S, E>
where
    S: UserRepository + OpportunityRepository + ApplicationRepository + 'static,
    E: EventPublisher + 'static,
{
    pub fn new(store: Arc<S>, events: Arc<E>, storage: StorageConfig) -> Self {
        let stats = StatsAggregator::new(Arc::clone(&store), storage.clone());
        Self {
            store,
            events,
            stats,
            storage,
        }
    }

    /// Persist a new opportunity for an existing poster.
    pub async fn publish(
        &self,
        mut opportunity: Opportunity,
    ) -> Result<Opportunity, ApplicationServiceError> {
        if opportunity.title.trim().is_empty() {
            return Err(ApplicationValidation::BlankTitle.into());
        }
        let poster = self.load_user(&opportunity.posted_by).await?;
        if poster.is_banned {
            return Err(ApplicationValidation::PosterBanned.into());
        }

        opportunity.refresh_status(Utc::now());
        let store = Arc::clone(&self.store);
        let stored =
            with_deadline(self.storage.timeout, move || store.insert_opportunity(opportunity))
                .await
                .map_err(|err| match err {
                    RepositoryError::Conflict => ApplicationServiceError::Duplicate,
                    other => other.into(),
                })?;

        info!(opportunity_id = %stored.id, platform = ?stored.platform, "opportunity published");
        Ok(stored)
    }

    pub async fn eligibility(
        &self,
        opportunity_id: &OpportunityId,
        user_id: &UserId,
    ) -> Result<EligibilityView, ApplicationServiceError> {
        let opportunity = self.current_opportunity(opportunity_id).await?;
        let user = self.load_user(user_id).await?;
        let reason = check_eligibility(&opportunity, &user, Utc::now()).err();

        Ok(EligibilityView {
            opportunity_id: opportunity.id,
            user_id: user.id,
            eligible: reason.is_none(),
            reason,
        })
    }

    /// Apply to an opportunity, then recount its stats.
    pub async fn apply(
        &self,
        opportunity_id: &OpportunityId,
        applicant_id: &UserId,
        draft: ApplicationDraft,
    ) -> Result<Application, ApplicationServiceError> {
        let draft = validate_draft(draft)?;
        let opportunity = self.current_opportunity(opportunity_id).await?;
        let applicant = self.load_user(applicant_id).await?;
        if applicant.is_banned {
            return Err(ApplicationValidation::ApplicantBanned.into());
        }

        let now = Utc::now();
        check_eligibility(&opportunity, &applicant, now)?;

        let settings = opportunity.application_settings;
        if settings.require_resume && draft.resume_url.is_none() {
            return Err(ApplicationValidation::MissingResume.into());
        }
        if settings.require_portfolio && draft.portfolio_url.is_none() {
            return Err(ApplicationValidation::MissingPortfolio.into());
        }

        let application = Application {
            id: ApplicationId::generate(),
            opportunity_id: opportunity.id.clone(),
            applicant_id: applicant.id.clone(),
            cover_letter: draft.cover_letter,
            resume_url: draft.resume_url,
            portfolio_url: draft.portfolio_url,
            status: ApplicationStatus::Pending,
            applied_at: now,
            status_updated_at: None,
        };

        let store = Arc::clone(&self.store);
        let stored =
            with_deadline(self.storage.timeout, move || store.insert_application(application))
                .await
                .map_err(|err| match err {
                    RepositoryError::Conflict => ApplicationServiceError::Duplicate,
                    other => other.into(),
                })?;

        self.refresh_stats(&stored.opportunity_id).await;
        info!(
            application_id = %stored.id,
            opportunity_id = %stored.opportunity_id,
            applicant_id = %stored.applicant_id,
            "application submitted"
        );
        self.announce(&stored, None);
        Ok(stored)
    }

    /// Move an application along its lifecycle. Withdrawal belongs to the applicant; every other
    /// transition belongs to the poster. Admins may do either.
    pub async fn update_status(
        &self,
        actor: &Caller,
        application_id: &ApplicationId,
        next: ApplicationStatus,
    ) -> Result<Application, ApplicationServiceError> {
        let mut application = self.load_application(application_id).await?;
        let opportunity = self.load_opportunity(&application.opportunity_id).await?;

        let permitted = actor.is_admin()
            || if next == ApplicationStatus::Withdrawn {
                actor.user_id == application.applicant_id
            } else {
                actor.user_id == opportunity.posted_by
            };
        if !permitted {
            return Err(ApplicationServiceError::Forbidden);
        }

        let previous = application.status;
        if !previous.can_transition_to(next) {
            return Err(ApplicationServiceError::InvalidTransition {
                from: previous,
                to: next,
            });
        }

        application.status = next;
        application.status_updated_at = Some(Utc::now());

        let store = Arc::clone(&self.store);
        let updated = application.clone();
        let written = with_deadline(self.storage.timeout, move || {
            store.update_application(updated, previous)
        })
        .await;
        if let Err(RepositoryError::StaleStatus { .. }) = written {
            let current = self.load_application(application_id).await?;
            warn!(
                %application_id,
                from = previous.label(),
                found = current.status.label(),
                "application status write lost a race"
            );
            return Err(ApplicationServiceError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }
        written?;

        self.refresh_stats(&application.opportunity_id).await;
        debug!(
            application_id = %application.id,
            from = previous.label(),
            to = next.label(),
            "application status changed"
        );
        self.announce(&application, Some(previous));
        Ok(application)
    }

    /// Applicant-side shortcut for withdrawing an application.
    pub async fn withdraw(
        &self,
        applicant_id: &UserId,
        application_id: &ApplicationId,
    ) -> Result<Application, ApplicationServiceError> {
        let actor = Caller {
            user_id: applicant_id.clone(),
            role: None,
        };
        self.update_status(&actor, application_id, ApplicationStatus::Withdrawn)
            .await
    }

    pub async fn stats(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<OpportunityStats, ApplicationServiceError> {
        Ok(self.load_opportunity(opportunity_id).await?.stats)
    }

    /// Force a recount, e.g. after a bulk import.
    pub async fn recount(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<OpportunityStats, ApplicationServiceError> {
        self.load_opportunity(opportunity_id).await?;
        Ok(self.stats.recompute(opportunity_id).await?)
    }

    pub async fn record_view(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<OpportunityStats, ApplicationServiceError> {
        let store = Arc::clone(&self.store);
        let id = opportunity_id.clone();
        with_deadline(self.storage.timeout, move || store.increment_views(&id))
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound => ApplicationServiceError::NotFound {
                    entity: "opportunity",
                    id: opportunity_id.to_string(),
                },
                other => other.into(),
            })
    }

    /// Close every active opportunity whose deadline passed before `now`.
    pub async fn close_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<OpportunityId>, ApplicationServiceError> {
        let store = Arc::clone(&self.store);
        let active = with_deadline(self.storage.timeout, move || store.active_opportunities()).await?;

        let mut closed = Vec::new();
        for mut opportunity in active {
            if opportunity.refresh_status(now) {
                let id = opportunity.id.clone();
                let store = Arc::clone(&self.store);
                with_deadline(self.storage.timeout, move || {
                    store.update_opportunity(opportunity)
                })
                .await?;
                info!(opportunity_id = %id, "expired opportunity closed");
                closed.push(id);
            }
        }
        Ok(closed)
    }

    /// Load an opportunity and persist the one-way expiry close if it is due.
    async fn current_opportunity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Opportunity, ApplicationServiceError> {
        let mut opportunity = self.load_opportunity(opportunity_id).await?;
        if opportunity.refresh_status(Utc::now()) {
            let store = Arc::clone(&self.store);
            let closed = opportunity.clone();
            with_deadline(self.storage.timeout, move || store.update_opportunity(closed)).await?;
            info!(%opportunity_id, "expired opportunity closed");
        }
        Ok(opportunity)
    }

    async fn load_opportunity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Opportunity, ApplicationServiceError> {
        let store = Arc::clone(&self.store);
        let id = opportunity_id.clone();
        with_deadline(self.storage.timeout, move || store.fetch_opportunity(&id))
            .await?
            .ok_or_else(|| ApplicationServiceError::NotFound {
                entity: "opportunity",
                id: opportunity_id.to_string(),
            })
    }

    async fn load_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Application, ApplicationServiceError> {
        let store = Arc::clone(&self.store);
        let id = application_id.clone();
        with_deadline(self.storage.timeout, move || store.fetch_application(&id))
            .await?
            .ok_or_else(|| ApplicationServiceError::NotFound {
                entity: "application",
                id: application_id.to_string(),
            })
    }

    async fn load_user(&self, user_id: &UserId) -> Result<User, ApplicationServiceError> {
        let store = Arc::clone(&self.store);
        let id = user_id.clone();
        with_deadline(self.storage.timeout, move || store.fetch_user(&id))
            .await?
            .ok_or_else(|| ApplicationServiceError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })
    }

    /// Recount after a committed application write. The write already stands, so a failed recount
    /// is logged and left for the next recount to heal.
    async fn refresh_stats(&self, opportunity_id: &OpportunityId) {
        if let Err(err) = self.stats.recompute(opportunity_id).await {
            warn!(%opportunity_id, error = %err, "stats recount failed after committed write");
        }
    }

    fn announce(&self, application: &Application, from: Option<ApplicationStatus>) {
        publish_best_effort(
            self.events.as_ref(),
            DomainEvent::ApplicationStatusChanged {
                application_id: application.id.clone(),
                opportunity_id: application.opportunity_id.clone(),
                from,
                to: application.status,
            },
        );
    }
}

fn validate_draft(mut draft: ApplicationDraft) -> Result<ApplicationDraft, ApplicationValidation> {
    if draft.cover_letter.trim().is_empty() {
        return Err(ApplicationValidation::BlankCoverLetter);
    }
    draft.resume_url = draft.resume_url.filter(|url| !url.trim().is_empty());
    draft.portfolio_url = draft.portfolio_url.filter(|url| !url.trim().is_empty());
    Ok(draft)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplicationValidation {
    #[error("cover letter is required")]
    BlankCoverLetter,
    #[error("opportunity requires a resume")]
    MissingResume,
    #[error("opportunity requires a portfolio")]
    MissingPortfolio,
    #[error("opportunity title is required")]
    BlankTitle,
    #[error("banned users cannot apply")]
    ApplicantBanned,
    #[error("banned users cannot post opportunities")]
    PosterBanned,
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Validation(#[from] ApplicationValidation),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Ineligible(#[from] IneligibleReason),
    #[error("cannot move application from {} to {}", .from.label(), .to.label())]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("record already exists")]
    Duplicate,
    #[error("caller may not perform this transition")]
    Forbidden,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
