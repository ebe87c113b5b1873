use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationDraft, ApplicationStatus, Opportunity, OpportunityDraft};
use super::repository::{ApplicationRepository, OpportunityRepository};
use super::service::{ApplicationService, ApplicationServiceError};
use crate::events::EventPublisher;
use crate::identity::{ApplicationId, Caller, OpportunityId};
use crate::store::RepositoryError;
use crate::users::UserRepository;

#[derive(Debug, Deserialize)]
pub(crate) struct StatusChangeRequest {
    pub(crate) status: ApplicationStatus,
}

/// Router builder exposing publishing, application intake, lifecycle and stats endpoints.
pub fn opportunity_router<S, E>(service: Arc<ApplicationService<S, E>>) -> Router
where
    S: UserRepository + OpportunityRepository + ApplicationRepository + 'static,
    E: EventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/opportunities", post(publish_handler::<S, E>))
        .route(
            "/api/v1/opportunities/:opportunity_id/applications",
            post(apply_handler::<S, E>),
        )
        .route(
            "/api/v1/opportunities/:opportunity_id/eligibility",
            get(eligibility_handler::<S, E>),
        )
        .route(
            "/api/v1/opportunities/:opportunity_id/stats",
            get(stats_handler::<S, E>),
        )
        .route(
            "/api/v1/opportunities/:opportunity_id/views",
            post(view_handler::<S, E>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            patch(status_handler::<S, E>),
        )
        .with_state(service)
}

/// Publish an opportunity posted by the caller.
pub(crate) async fn publish_handler<S, E>(
    State(service): State<Arc<ApplicationService<S, E>>>,
    caller: Caller,
    Json(draft): Json<OpportunityDraft>,
) -> Response
where
    S: UserRepository + OpportunityRepository + ApplicationRepository + 'static,
    E: EventPublisher + 'static,
{
    match service
        .publish(Opportunity::from_draft(caller.user_id, draft))
        .await
    {
        Ok(opportunity) => (StatusCode::CREATED, Json(opportunity)).into_response(),
        Err(error) => application_error_response(error),
    }
}

pub(crate) async fn apply_handler<S, E>(
    State(service): State<Arc<ApplicationService<S, E>>>,
    caller: Caller,
    Path(opportunity_id): Path<String>,
    Json(draft): Json<ApplicationDraft>,
) -> Response
where
    S: UserRepository + OpportunityRepository + ApplicationRepository + 'static,
    E: EventPublisher + 'static,
{
    match service
        .apply(&OpportunityId(opportunity_id), &caller.user_id, draft)
        .await
    {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(error) => application_error_response(error),
    }
}

pub(crate) async fn eligibility_handler<S, E>(
    State(service): State<Arc<ApplicationService<S, E>>>,
    caller: Caller,
    Path(opportunity_id): Path<String>,
) -> Response
where
    S: UserRepository + OpportunityRepository + ApplicationRepository + 'static,
    E: EventPublisher + 'static,
{
    match service
        .eligibility(&OpportunityId(opportunity_id), &caller.user_id)
        .await
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => application_error_response(error),
    }
}

pub(crate) async fn stats_handler<S, E>(
    State(service): State<Arc<ApplicationService<S, E>>>,
    Path(opportunity_id): Path<String>,
) -> Response
where
    S: UserRepository + OpportunityRepository + ApplicationRepository + 'static,
    E: EventPublisher + 'static,
{
    match service.stats(&OpportunityId(opportunity_id)).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(error) => application_error_response(error),
    }
}

pub(crate) async fn view_handler<S, E>(
    State(service): State<Arc<ApplicationService<S, E>>>,
    Path(opportunity_id): Path<String>,
) -> Response
where
    S: UserRepository + OpportunityRepository + ApplicationRepository + 'static,
    E: EventPublisher + 'static,
{
    match service.record_view(&OpportunityId(opportunity_id)).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(error) => application_error_response(error),
    }
}

pub(crate) async fn status_handler<S, E>(
    State(service): State<Arc<ApplicationService<S, E>>>,
    caller: Caller,
    Path(application_id): Path<String>,
    Json(request): Json<StatusChangeRequest>,
) -> Response
where
    S: UserRepository + OpportunityRepository + ApplicationRepository + 'static,
    E: EventPublisher + 'static,
{
    match service
        .update_status(&caller, &ApplicationId(application_id), request.status)
        .await
    {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(error) => application_error_response(error),
    }
}

pub(crate) fn application_error_response(error: ApplicationServiceError) -> Response {
    let status = match &error {
        ApplicationServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ApplicationServiceError::NotFound { .. }
        | ApplicationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ApplicationServiceError::Ineligible(_) | ApplicationServiceError::Forbidden => {
            StatusCode::FORBIDDEN
        }
        ApplicationServiceError::InvalidTransition { .. }
        | ApplicationServiceError::Duplicate
        | ApplicationServiceError::Repository(RepositoryError::Conflict)
        | ApplicationServiceError::Repository(RepositoryError::VersionMismatch { .. })
        | ApplicationServiceError::Repository(RepositoryError::StaleStatus { .. }) => {
            StatusCode::CONFLICT
        }
        ApplicationServiceError::Repository(err) if err.is_transient() => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ApplicationServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut payload = json!({ "error": error.to_string() });
    if let ApplicationServiceError::Ineligible(reason) = &error {
        payload["reason"] = json!(reason);
    }
    (status, Json(payload)).into_response()
}
