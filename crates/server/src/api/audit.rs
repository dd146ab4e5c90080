//! Audit trail queries.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use helpdesk_core::{AuditFilter, AuditRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

/// Maximum allowed limit for audit queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for audit queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for the audit endpoint
#[derive(Debug, Default, Deserialize)]
pub struct AuditQueryParams {
    pub ticket_id: Option<String>,
    /// e.g. `ticket_created`, `ticket_status_changed`
    pub event_type: Option<String>,
    /// Requester id or status-change actor
    pub user_id: Option<String>,
    /// Events at or after this timestamp (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Events at or before this timestamp (RFC 3339)
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AuditQueryResponse {
    /// Matching events, newest first
    pub events: Vec<AuditRecord>,
    /// Total number of matching events
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct AuditErrorResponse {
    pub error: String,
}

type AuditApiError = (StatusCode, Json<AuditErrorResponse>);

fn internal(context: &str, e: impl std::fmt::Display) -> AuditApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(AuditErrorResponse {
            error: format!("{}: {}", context, e),
        }),
    )
}

/// Run a paginated query; `total` counts every match regardless of paging.
fn run_query(
    state: &AppState,
    base_filter: AuditFilter,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<AuditQueryResponse, AuditApiError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = offset.unwrap_or(0).max(0);

    let query_filter = base_filter.clone().with_limit(limit).with_offset(offset);

    let events = state
        .audit_store()
        .query(&query_filter)
        .map_err(|e| internal("Failed to query audit events", e))?;

    let total = state
        .audit_store()
        .count(&base_filter)
        .map_err(|e| internal("Failed to count audit events", e))?;

    Ok(AuditQueryResponse {
        events,
        total,
        limit,
        offset,
    })
}

/// Query audit events
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditQueryResponse>, AuditApiError> {
    let mut filter = AuditFilter::new();

    if let Some(ref ticket_id) = params.ticket_id {
        filter = filter.with_ticket_id(ticket_id);
    }
    if let Some(ref event_type) = params.event_type {
        filter = filter.with_event_type(event_type);
    }
    if let Some(ref user_id) = params.user_id {
        filter = filter.with_user_id(user_id);
    }
    if params.from.is_some() || params.to.is_some() {
        filter = filter.with_time_range(params.from, params.to);
    }

    run_query(&state, filter, params.limit, params.offset).map(Json)
}

/// Pagination for a single ticket's history
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Everything recorded about one ticket
pub async fn ticket_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<AuditQueryResponse>, AuditApiError> {
    let filter = AuditFilter::new().with_ticket_id(id);
    run_query(&state, filter, params.limit, params.offset).map(Json)
}
