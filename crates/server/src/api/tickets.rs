//! Ticket API handlers.
//!
//! `POST /tickets` is the web form: it goes through the support desk so the
//! ticket is forwarded and audited like one opened from the bot.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use helpdesk_core::{
    DeskError, Requester, Ticket, TicketCategory, TicketError, TicketFilter, TicketSource,
    TicketStatus,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use super::middleware::AuthUser;
use crate::state::AppState;

/// Maximum allowed limit for ticket queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for ticket queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for the web form
#[derive(Debug, Deserialize)]
pub struct SubmitTicketBody {
    /// Account id of the person asking for help
    pub requester_id: String,
    /// Name shown to admins
    pub requester_name: String,
    /// Category code (see `GET /categories`)
    pub category: String,
    pub message: String,
    /// Optional image reference (URL or file id)
    pub image_ref: Option<String>,
}

/// Query parameters for listing tickets
#[derive(Debug, Deserialize)]
pub struct ListTicketsParams {
    pub status: Option<String>,
    pub category: Option<String>,
    pub requester_id: Option<String>,
    /// Maximum number of tickets to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

/// Request body for an admin status change
#[derive(Debug, Deserialize)]
pub struct SetStatusBody {
    pub status: String,
}

/// Response for ticket operations
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: String,
    pub requester_id: String,
    pub requester_name: String,
    pub category: TicketCategory,
    pub category_label: &'static str,
    pub status: TicketStatus,
    pub status_label: &'static str,
    pub message: Option<String>,
    pub image_ref: Option<String>,
    pub source: TicketSource,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            requester_id: ticket.requester.user_id,
            requester_name: ticket.requester.display_name,
            category_label: ticket.category.label(),
            category: ticket.category,
            status_label: ticket.status.label(),
            status: ticket.status,
            message: ticket.message,
            image_ref: ticket.image_ref,
            source: ticket.source,
            created_at: ticket.created_at.to_rfc3339(),
            updated_at: ticket.updated_at.to_rfc3339(),
        }
    }
}

/// Response for listing tickets
#[derive(Debug, Serialize)]
pub struct ListTicketsResponse {
    pub tickets: Vec<TicketResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct TicketErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<TicketErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(TicketErrorResponse {
            error: message.into(),
        }),
    )
}

impl From<DeskError> for TicketErrorResponse {
    fn from(e: DeskError) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}

fn desk_error(e: DeskError) -> ApiError {
    let status = match &e {
        DeskError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DeskError::Ticket(TicketError::NotFound(_)) => StatusCode::NOT_FOUND,
        DeskError::Ticket(TicketError::InvalidTransition { .. })
        | DeskError::Ticket(TicketError::AlreadyAttached { .. }) => StatusCode::CONFLICT,
        DeskError::Ticket(TicketError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(TicketErrorResponse::from(e)))
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a ticket from the web form
pub async fn submit_ticket(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitTicketBody>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    let requester = Requester::new(body.requester_id.trim(), body.requester_name.trim());

    let ticket = state
        .desk()
        .submit_form(
            &requester,
            &body.category,
            &body.message,
            body.image_ref.as_deref(),
        )
        .await
        .map_err(desk_error)?;

    Ok((StatusCode::CREATED, Json(TicketResponse::from(ticket))))
}

/// Get a ticket by ID
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TicketResponse>, ApiError> {
    match state.ticket_store().get(&id) {
        Ok(Some(ticket)) => Ok(Json(TicketResponse::from(ticket))),
        Ok(None) => Err(error(
            StatusCode::NOT_FOUND,
            format!("Ticket not found: {}", id),
        )),
        Err(e) => Err(error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// List tickets with optional filters
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTicketsParams>,
) -> Result<Json<ListTicketsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = TicketFilter::new().with_limit(limit).with_offset(offset);

    if let Some(ref status) = params.status {
        let status = TicketStatus::from_str(status)
            .map_err(|s| error(StatusCode::BAD_REQUEST, format!("unknown status: {}", s)))?;
        filter = filter.with_status(status);
    }

    if let Some(ref category) = params.category {
        let category = TicketCategory::from_str(category)
            .map_err(|c| error(StatusCode::BAD_REQUEST, format!("unknown category: {}", c)))?;
        filter = filter.with_category(category);
    }

    if let Some(ref requester_id) = params.requester_id {
        filter = filter.with_requester(requester_id);
    }

    let tickets = state
        .ticket_store()
        .list(&filter)
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    // Get total count (without pagination)
    let count_filter = TicketFilter {
        limit: i64::MAX,
        offset: 0,
        ..filter.clone()
    };

    let total = state
        .ticket_store()
        .count(&count_filter)
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(ListTicketsResponse {
        tickets: tickets.into_iter().map(TicketResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// Move a ticket along its lifecycle (admin action)
pub async fn set_ticket_status(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<SetStatusBody>,
) -> Result<Json<TicketResponse>, ApiError> {
    let status = TicketStatus::from_str(&body.status)
        .map_err(|s| error(StatusCode::BAD_REQUEST, format!("unknown status: {}", s)))?;

    let actor = format!("api:{}", user_id);
    let ticket = state
        .desk()
        .set_status(&id, status, &actor)
        .await
        .map_err(desk_error)?;

    Ok(Json(TicketResponse::from(ticket)))
}
