use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::repository::LedgerRepository;
use super::service::{LedgerError, ReputationLedger};
use crate::events::EventPublisher;
use crate::identity::{Caller, UserId};
use crate::store::RepositoryError;
use crate::users::UserRepository;

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub(crate) struct AdjustmentRequest {
    pub(crate) amount: i64,
    pub(crate) reason: String,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct HistoryQuery {
    pub(crate) limit: Option<usize>,
}

/// Router exposing ledger adjustments, standing lookups and history.
pub fn reputation_router<S, E>(ledger: Arc<ReputationLedger<S, E>>) -> Router
where
    S: UserRepository + LedgerRepository + 'static,
    E: EventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/reputation/:user_id", get(standing_handler::<S, E>))
        .route(
            "/api/v1/reputation/:user_id/entries",
            post(adjust_handler::<S, E>),
        )
        .route(
            "/api/v1/reputation/:user_id/history",
            get(history_handler::<S, E>),
        )
        .route(
            "/api/v1/reputation/:user_id/reconcile",
            post(reconcile_handler::<S, E>),
        )
        .with_state(ledger)
}

pub(crate) async fn adjust_handler<S, E>(
    State(ledger): State<Arc<ReputationLedger<S, E>>>,
    caller: Caller,
    Path(user_id): Path<String>,
    Json(request): Json<AdjustmentRequest>,
) -> Response
where
    S: UserRepository + LedgerRepository + 'static,
    E: EventPublisher + 'static,
{
    if !caller.is_admin() {
        return forbidden("reputation adjustments require an admin role");
    }

    match ledger
        .append(&UserId(user_id), request.amount, &request.reason)
        .await
    {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(error) => ledger_error_response(error),
    }
}

pub(crate) async fn standing_handler<S, E>(
    State(ledger): State<Arc<ReputationLedger<S, E>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: UserRepository + LedgerRepository + 'static,
    E: EventPublisher + 'static,
{
    match ledger.standing(&UserId(user_id)).await {
        Ok(standing) => (StatusCode::OK, Json(standing)).into_response(),
        Err(error) => ledger_error_response(error),
    }
}

pub(crate) async fn history_handler<S, E>(
    State(ledger): State<Arc<ReputationLedger<S, E>>>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    S: UserRepository + LedgerRepository + 'static,
    E: EventPublisher + 'static,
{
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    match ledger.history(&UserId(user_id), limit).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(error) => ledger_error_response(error),
    }
}

pub(crate) async fn reconcile_handler<S, E>(
    State(ledger): State<Arc<ReputationLedger<S, E>>>,
    caller: Caller,
    Path(user_id): Path<String>,
) -> Response
where
    S: UserRepository + LedgerRepository + 'static,
    E: EventPublisher + 'static,
{
    if !caller.is_admin() {
        return forbidden("reconciliation requires an admin role");
    }

    match ledger.reconcile(&UserId(user_id)).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => ledger_error_response(error),
    }
}

fn forbidden(message: &str) -> Response {
    (StatusCode::FORBIDDEN, Json(json!({ "error": message }))).into_response()
}

pub(crate) fn ledger_error_response(error: LedgerError) -> Response {
    let status = match &error {
        LedgerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::NotFound(_) | LedgerError::Repository(RepositoryError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        LedgerError::ConcurrencyConflict { .. } => StatusCode::CONFLICT,
        LedgerError::Repository(err) if err.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::ConsistencyViolation { .. } | LedgerError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(json!({ "error": error.to_string() }))).into_response()
}
