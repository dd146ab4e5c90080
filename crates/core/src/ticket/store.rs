//! Ticket storage trait and types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::ticket::{Requester, Ticket, TicketCategory, TicketSource, TicketStatus};

/// Error type for ticket operations.
#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Ticket not found: {0}")]
    NotFound(String),

    #[error("Cannot move ticket {ticket_id} from {from} to {to}")]
    InvalidTransition {
        ticket_id: String,
        from: TicketStatus,
        to: TicketStatus,
    },

    #[error("Ticket {ticket_id} already has {field} attached")]
    AlreadyAttached {
        ticket_id: String,
        field: &'static str,
    },

    #[error("Database error: {0}")]
    Database(String),
}

/// Request to create a new ticket.
#[derive(Debug, Clone)]
pub struct CreateTicketRequest {
    pub requester: Requester,
    pub category: TicketCategory,
    pub source: TicketSource,
}

/// Partial update of a ticket.
///
/// Every field is optional; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketPatch {
    pub status: Option<TicketStatus>,
    pub message: Option<String>,
    pub image_ref: Option<String>,
}

impl TicketPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    /// Apply this patch to `ticket`, enforcing the attach-once and status
    /// transition rules. On error `ticket` is left unchanged.
    pub fn apply(&self, ticket: &mut Ticket, now: DateTime<Utc>) -> Result<(), TicketError> {
        if self.message.is_some() && ticket.message.is_some() {
            return Err(TicketError::AlreadyAttached {
                ticket_id: ticket.id.clone(),
                field: "message",
            });
        }

        if self.image_ref.is_some() && ticket.image_ref.is_some() {
            return Err(TicketError::AlreadyAttached {
                ticket_id: ticket.id.clone(),
                field: "image",
            });
        }

        if let Some(next) = self.status {
            if !ticket.status.can_transition_to(next) {
                return Err(TicketError::InvalidTransition {
                    ticket_id: ticket.id.clone(),
                    from: ticket.status,
                    to: next,
                });
            }
        }

        if let Some(ref message) = self.message {
            ticket.message = Some(message.clone());
        }
        if let Some(ref image_ref) = self.image_ref {
            ticket.image_ref = Some(image_ref.clone());
        }
        if let Some(next) = self.status {
            ticket.status = next;
        }
        ticket.updated_at = now;

        Ok(())
    }
}

/// Filter for querying tickets.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    /// Filter by requester user id.
    pub requester_id: Option<String>,
    pub status: Option<TicketStatus>,
    pub category: Option<TicketCategory>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl TicketFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            requester_id: None,
            status: None,
            category: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_requester(mut self, user_id: impl Into<String>) -> Self {
        self.requester_id = Some(user_id.into());
        self
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_category(mut self, category: TicketCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Returns true if `ticket` passes every condition (ignores pagination).
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.requester_id
            .as_deref()
            .is_none_or(|id| ticket.requester.user_id == id)
            && self.status.is_none_or(|s| ticket.status == s)
            && self.category.is_none_or(|c| ticket.category == c)
    }
}

/// Trait for ticket storage backends.
///
/// Tickets are never deleted. `list` returns tickets in ascending creation
/// order.
pub trait TicketStore: Send + Sync {
    /// Create a new ticket in `AwaitingMessage` status.
    fn create(&self, request: CreateTicketRequest) -> Result<Ticket, TicketError>;

    /// Get a ticket by ID.
    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError>;

    /// Apply a patch and return the updated ticket.
    fn update(&self, id: &str, patch: TicketPatch) -> Result<Ticket, TicketError>;

    /// List tickets matching the filter.
    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError>;

    /// Count tickets matching the filter (ignores limit and offset).
    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError>;
}
