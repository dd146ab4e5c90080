//! Audit events for the support desk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Something worth keeping a permanent record of.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
        /// Username of the bot the token belongs to.
        bot_username: Option<String>,
    },
    ServiceStopped {
        reason: String,
    },

    // Ticket lifecycle
    TicketCreated {
        ticket_id: String,
        requester_id: String,
        category: String,
        source: String,
    },
    /// The requester's message was attached; the ticket moved to `received`.
    TicketReceived {
        ticket_id: String,
        requester_id: String,
        has_image: bool,
    },
    ImageAttached {
        ticket_id: String,
        requester_id: String,
    },
    /// A ticket still awaiting its message was closed.
    TicketAbandoned {
        ticket_id: String,
        requester_id: String,
        /// "superseded" or "expired"
        reason: String,
    },
    TicketStatusChanged {
        ticket_id: String,
        changed_by: String,
        from_status: String,
        to_status: String,
    },

    // Admin notification
    TicketForwarded {
        ticket_id: String,
        with_image: bool,
    },
    TicketForwardFailed {
        ticket_id: String,
        error: String,
    },
}

impl AuditEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::TicketCreated { .. } => "ticket_created",
            Self::TicketReceived { .. } => "ticket_received",
            Self::ImageAttached { .. } => "image_attached",
            Self::TicketAbandoned { .. } => "ticket_abandoned",
            Self::TicketStatusChanged { .. } => "ticket_status_changed",
            Self::TicketForwarded { .. } => "ticket_forwarded",
            Self::TicketForwardFailed { .. } => "ticket_forward_failed",
        }
    }

    pub fn ticket_id(&self) -> Option<&str> {
        match self {
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => None,
            Self::TicketCreated { ticket_id, .. }
            | Self::TicketReceived { ticket_id, .. }
            | Self::ImageAttached { ticket_id, .. }
            | Self::TicketAbandoned { ticket_id, .. }
            | Self::TicketStatusChanged { ticket_id, .. }
            | Self::TicketForwarded { ticket_id, .. }
            | Self::TicketForwardFailed { ticket_id, .. } => Some(ticket_id),
        }
    }

    /// The user who caused the event, if any.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::TicketCreated { requester_id, .. }
            | Self::TicketReceived { requester_id, .. }
            | Self::ImageAttached { requester_id, .. }
            | Self::TicketAbandoned { requester_id, .. } => Some(requester_id),
            Self::TicketStatusChanged { changed_by, .. } => Some(changed_by),
            _ => None,
        }
    }
}

/// A stored audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub ticket_id: Option<String>,
    pub user_id: Option<String>,
    pub data: AuditEvent,
}
