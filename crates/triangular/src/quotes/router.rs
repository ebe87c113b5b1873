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

use super::domain::{QuoteDraft, QuoteRequestDraft, QuoteStatus};
use super::repository::QuoteRepository;
use super::service::{QuoteService, QuoteServiceError};
use crate::identity::{Caller, QuoteId, QuoteRequestId};
use crate::store::RepositoryError;
use crate::users::UserRepository;

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteStatusRequest {
    pub(crate) status: QuoteStatus,
}

/// Router builder for quote requests, quote submission, ranking and awarding.
pub fn quote_router<S>(service: Arc<QuoteService<S>>) -> Router
where
    S: UserRepository + QuoteRepository + 'static,
{
    Router::new()
        .route("/api/v1/quote-requests", post(open_request_handler::<S>))
        .route(
            "/api/v1/quote-requests/:request_id",
            get(request_handler::<S>),
        )
        .route(
            "/api/v1/quote-requests/:request_id/quotes",
            post(submit_handler::<S>).get(ranked_handler::<S>),
        )
        .route(
            "/api/v1/quote-requests/:request_id/rescore",
            post(rescore_handler::<S>),
        )
        .route("/api/v1/quotes/:quote_id/status", patch(status_handler::<S>))
        .route(
            "/api/v1/quotes/:quote_id/breakdown",
            get(breakdown_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn open_request_handler<S>(
    State(service): State<Arc<QuoteService<S>>>,
    caller: Caller,
    Json(draft): Json<QuoteRequestDraft>,
) -> Response
where
    S: UserRepository + QuoteRepository + 'static,
{
    match service.open_request(&caller.user_id, draft).await {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(error) => quote_error_response(error),
    }
}

pub(crate) async fn request_handler<S>(
    State(service): State<Arc<QuoteService<S>>>,
    Path(request_id): Path<String>,
) -> Response
where
    S: UserRepository + QuoteRepository + 'static,
{
    match service.request(&QuoteRequestId(request_id)).await {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(error) => quote_error_response(error),
    }
}

pub(crate) async fn submit_handler<S>(
    State(service): State<Arc<QuoteService<S>>>,
    caller: Caller,
    Path(request_id): Path<String>,
    Json(draft): Json<QuoteDraft>,
) -> Response
where
    S: UserRepository + QuoteRepository + 'static,
{
    match service
        .submit_quote(&QuoteRequestId(request_id), &caller.user_id, draft)
        .await
    {
        Ok(quote) => (StatusCode::CREATED, Json(quote)).into_response(),
        Err(error) => quote_error_response(error),
    }
}

pub(crate) async fn ranked_handler<S>(
    State(service): State<Arc<QuoteService<S>>>,
    Path(request_id): Path<String>,
) -> Response
where
    S: UserRepository + QuoteRepository + 'static,
{
    match service.rank_quotes(&QuoteRequestId(request_id)).await {
        Ok(quotes) => (StatusCode::OK, Json(quotes)).into_response(),
        Err(error) => quote_error_response(error),
    }
}

pub(crate) async fn rescore_handler<S>(
    State(service): State<Arc<QuoteService<S>>>,
    caller: Caller,
    Path(request_id): Path<String>,
) -> Response
where
    S: UserRepository + QuoteRepository + 'static,
{
    if !caller.is_admin() {
        return quote_error_response(QuoteServiceError::Forbidden);
    }
    match service.rescore(&QuoteRequestId(request_id)).await {
        Ok(quotes) => (StatusCode::OK, Json(quotes)).into_response(),
        Err(error) => quote_error_response(error),
    }
}

pub(crate) async fn status_handler<S>(
    State(service): State<Arc<QuoteService<S>>>,
    caller: Caller,
    Path(quote_id): Path<String>,
    Json(request): Json<QuoteStatusRequest>,
) -> Response
where
    S: UserRepository + QuoteRepository + 'static,
{
    match service
        .update_quote_status(&caller, &QuoteId(quote_id), request.status)
        .await
    {
        Ok(quote) => (StatusCode::OK, Json(quote)).into_response(),
        Err(error) => quote_error_response(error),
    }
}

pub(crate) async fn breakdown_handler<S>(
    State(service): State<Arc<QuoteService<S>>>,
    Path(quote_id): Path<String>,
) -> Response
where
    S: UserRepository + QuoteRepository + 'static,
{
    match service.breakdown(&QuoteId(quote_id)).await {
        Ok(breakdown) => {
            let total = breakdown.total();
            (
                StatusCode::OK,
                Json(json!({ "breakdown": breakdown, "total": total })),
            )
                .into_response()
        }
        Err(error) => quote_error_response(error),
    }
}

pub(crate) fn quote_error_response(error: QuoteServiceError) -> Response {
    let status = match &error {
        QuoteServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        QuoteServiceError::NotFound { .. }
        | QuoteServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        QuoteServiceError::Forbidden => StatusCode::FORBIDDEN,
        QuoteServiceError::RequestClosed { .. }
        | QuoteServiceError::InvalidTransition { .. }
        | QuoteServiceError::Duplicate
        | QuoteServiceError::Repository(RepositoryError::Conflict)
        | QuoteServiceError::Repository(RepositoryError::VersionMismatch { .. })
        | QuoteServiceError::Repository(RepositoryError::StaleStatus { .. }) => {
            StatusCode::CONFLICT
        }
        QuoteServiceError::Repository(err) if err.is_transient() => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        QuoteServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(json!({ "error": error.to_string() }))).into_response()
}
