//! The support workflow shared by the bot and the web form.
//!
//! [`SupportDesk`] composes the ticket store, the conversation tracker and the
//! admin forwarder. Bot-facing operations answer with a [`Reply`]; the web
//! form and admin operations answer with the ticket itself.

mod desk;
mod reply;

pub use desk::SupportDesk;
pub use reply::{category_keyboard, Reply, CATEGORY_CALLBACK_PREFIX};

use thiserror::Error;

use crate::ticket::TicketError;

#[derive(Debug, Error)]
pub enum DeskError {
    /// Input rejected before anything was stored.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Ticket(#[from] TicketError),
}
