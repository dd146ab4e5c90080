//! Core ticket data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Support category chosen by the requester.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    Technical,
    Account,
    Payment,
    Suggestion,
    Other,
}

impl TicketCategory {
    /// All categories, in the order they are offered to users.
    pub const ALL: [TicketCategory; 5] = [
        TicketCategory::Technical,
        TicketCategory::Account,
        TicketCategory::Payment,
        TicketCategory::Suggestion,
        TicketCategory::Other,
    ];

    /// Returns the category code (used in storage, callbacks and filters).
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketCategory::Technical => "technical",
            TicketCategory::Account => "account",
            TicketCategory::Payment => "payment",
            TicketCategory::Suggestion => "suggestion",
            TicketCategory::Other => "other",
        }
    }
}

impl fmt::Display for TicketCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketCategory {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        TicketCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == code)
            .ok_or_else(|| code.to_string())
    }
}

/// Status of a ticket.
///
/// ```text
/// AwaitingMessage -> Received -> Responded -> Closed
///        |              |                       ^
///        +--------------+-----------------------+
/// ```
///
/// `AwaitingMessage -> Closed` only happens when the ticket is abandoned
/// (superseded by a new category selection or the pending entry expired).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Created, waiting for the requester's free-text message.
    AwaitingMessage,
    /// Message attached and forwarded to the admin channel.
    Received,
    /// An admin answered the requester.
    Responded,
    /// No further changes (terminal).
    Closed,
}

impl TicketStatus {
    /// Returns the status code as a string (for filtering and storage).
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::AwaitingMessage => "awaiting_message",
            TicketStatus::Received => "received",
            TicketStatus::Responded => "responded",
            TicketStatus::Closed => "closed",
        }
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Closed)
    }

    /// Returns true if a ticket may move from `self` to `next`.
    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, next),
            (AwaitingMessage, Received)
                | (AwaitingMessage, Closed)
                | (Received, Responded)
                | (Received, Closed)
                | (Responded, Closed)
        )
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "awaiting_message" => Ok(TicketStatus::AwaitingMessage),
            "received" => Ok(TicketStatus::Received),
            "responded" => Ok(TicketStatus::Responded),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(other.to_string()),
        }
    }
}

/// Front end a ticket was opened from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketSource {
    #[default]
    Bot,
    Web,
}

impl TicketSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketSource::Bot => "bot",
            TicketSource::Web => "web",
        }
    }
}

impl FromStr for TicketSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bot" => Ok(TicketSource::Bot),
            "web" => Ok(TicketSource::Web),
            other => Err(other.to_string()),
        }
    }
}

/// Identity of the person who opened a ticket on the external platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requester {
    /// Platform user id (Telegram user id, or the web account id).
    pub user_id: String,
    /// Display name at the time the ticket was opened.
    pub display_name: String,
}

impl Requester {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// A single support request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    /// Time-based identifier (Unix milliseconds, strictly increasing per store).
    pub id: String,

    /// Who opened the ticket.
    pub requester: Requester,

    pub category: TicketCategory,

    pub status: TicketStatus,

    /// Free-text body, attached at most once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Platform file reference or URL of an attached image, attached at most once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,

    #[serde(default)]
    pub source: TicketSource,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Returns true if the ticket is owned by the given platform user.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.requester.user_id == user_id
    }
}
