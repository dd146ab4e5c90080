//! Forwarding of received tickets to the administrative channel.

mod summary;
mod telegram;

pub use summary::{admin_keyboard, format_ticket_summary, AdminAction};
pub use telegram::TelegramForwarder;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::telegram::BotApiError;
use crate::ticket::Ticket;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Delivery failed: {0}")]
    Delivery(#[from] BotApiError),
}

/// Delivers a ticket summary to the administrators.
///
/// Failures are reported to the caller, which logs them; nothing is retried.
#[async_trait]
pub trait TicketForwarder: Send + Sync {
    async fn forward(&self, ticket: &Ticket) -> Result<(), ForwardError>;

    /// False when forwarding is switched off and `forward` does nothing.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Forwarder used when no admin chat is configured.
#[derive(Debug, Default)]
pub struct NoopForwarder;

#[async_trait]
impl TicketForwarder for NoopForwarder {
    async fn forward(&self, ticket: &Ticket) -> Result<(), ForwardError> {
        debug!(ticket_id = %ticket.id, "Forwarding disabled, ticket not sent");
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
