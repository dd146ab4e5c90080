use std::fmt::Write;

use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};
use crate::ticket::{Ticket, TicketCategory};

/// Callback data prefix of the category buttons (`category:<code>`).
pub const CATEGORY_CALLBACK_PREFIX: &str = "category:";

/// Most tickets listed in one bot message.
const MAX_LISTED_TICKETS: usize = 20;

/// Outcome of a bot-facing desk operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Welcome,
    UnknownCategory { code: String },
    AwaitingMessage { ticket: Ticket },
    Accepted { ticket: Ticket },
    EmptyMessage,
    ImageAttached { ticket: Ticket },
    ImageAlreadyAttached,
    Tickets { tickets: Vec<Ticket> },
    Status { ticket: Ticket },
    MalformedCode { code: String },
    TicketNotFound { code: String },
    /// Nothing to say; the input did not belong to any conversation.
    Ignored,
}

impl Reply {
    /// Text sent back to the user, `None` for [`Reply::Ignored`].
    pub fn text(&self) -> Option<String> {
        let text = match self {
            Reply::Welcome => {
                "Hello! This is the support service. Choose the category of your request:"
                    .to_string()
            }
            Reply::UnknownCategory { code } => format!(
                "Unknown category \"{}\". Please choose one of the buttons.",
                code
            ),
            Reply::AwaitingMessage { ticket } => format!(
                "Ticket #{} ({}) created.\nDescribe your problem in one message. \
                 You can also attach a screenshot.",
                ticket.id,
                ticket.category.label()
            ),
            Reply::Accepted { ticket } => format!(
                "Thank you! Your request #{} has been received. We will get back to you soon.",
                ticket.id
            ),
            Reply::EmptyMessage => "Please describe your problem in text.".to_string(),
            Reply::ImageAttached { ticket } => format!(
                "Image attached to ticket #{}. Now describe your problem in text.",
                ticket.id
            ),
            Reply::ImageAlreadyAttached => {
                "Only one image can be attached to a ticket.".to_string()
            }
            Reply::Tickets { tickets } => list_text(tickets),
            Reply::Status { ticket } => format!(
                "Ticket #{}\nCategory: {}\nStatus: {}\nCreated: {}",
                ticket.id,
                ticket.category.label(),
                ticket.status.label(),
                ticket.created_at.format("%Y-%m-%d %H:%M UTC")
            ),
            Reply::MalformedCode { code } if code.is_empty() => {
                "Use /status followed by the 13-digit ticket number, e.g. /status 1700000000000."
                    .to_string()
            }
            Reply::MalformedCode { code } => format!(
                "\"{}\" is not a ticket number. Use /status followed by the 13-digit number, \
                 e.g. /status 1700000000000.",
                code
            ),
            Reply::TicketNotFound { code } => format!("Ticket #{} not found.", code),
            Reply::Ignored => return None,
        };
        Some(text)
    }

    /// Buttons attached to the reply.
    pub fn keyboard(&self) -> Option<InlineKeyboardMarkup> {
        match self {
            Reply::Welcome | Reply::UnknownCategory { .. } => Some(category_keyboard()),
            _ => None,
        }
    }
}

fn list_text(tickets: &[Ticket]) -> String {
    if tickets.is_empty() {
        return "You have no tickets yet. Send /start to create one.".to_string();
    }

    let mut out = String::from("Your tickets:");
    let skip = tickets.len().saturating_sub(MAX_LISTED_TICKETS);
    for ticket in &tickets[skip..] {
        let _ = write!(
            out,
            "\n#{} | {} | {}",
            ticket.id,
            ticket.category.label(),
            ticket.status.label()
        );
    }
    if skip > 0 {
        let _ = write!(
            out,
            "\n(showing the latest {} of {})",
            MAX_LISTED_TICKETS,
            tickets.len()
        );
    }
    out
}

/// One button per category.
pub fn category_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single_column(
        TicketCategory::ALL
            .iter()
            .map(|c| {
                InlineKeyboardButton::callback(
                    c.label(),
                    format!("{}{}", CATEGORY_CALLBACK_PREFIX, c.as_str()),
                )
            })
            .collect(),
    )
}
