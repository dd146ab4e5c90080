use std::fmt::Write;

use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};
use crate::ticket::Ticket;

/// Build the text posted to the admin chat for a ticket.
pub fn format_ticket_summary(ticket: &Ticket) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "New support ticket #{}", ticket.id);
    let _ = writeln!(out, "Category: {}", ticket.category.label());
    let _ = writeln!(out, "Status: {}", ticket.status.label());
    let _ = writeln!(
        out,
        "From: {} (id {})",
        ticket.requester.display_name, ticket.requester.user_id
    );
    let _ = writeln!(out, "Source: {}", ticket.source.as_str());
    let _ = write!(
        out,
        "Created: {}",
        ticket.created_at.format("%Y-%m-%d %H:%M UTC")
    );

    if let Some(ref message) = ticket.message {
        let _ = write!(out, "\n\n{}", message);
    }
    if ticket.image_ref.is_some() {
        let _ = write!(out, "\n\n[image attached]");
    }

    out
}

/// Buttons shown under a forwarded ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    MarkResponded,
    ForwardToEmail,
}

impl AdminAction {
    const PREFIX: &'static str = "admin";

    fn code(&self) -> &'static str {
        match self {
            AdminAction::MarkResponded => "responded",
            AdminAction::ForwardToEmail => "email",
        }
    }

    pub fn callback_data(&self, ticket_id: &str) -> String {
        format!("{}:{}:{}", Self::PREFIX, self.code(), ticket_id)
    }

    /// Parse `admin:<action>:<ticket id>` callback data.
    pub fn parse(data: &str) -> Option<(AdminAction, &str)> {
        let mut parts = data.splitn(3, ':');
        if parts.next()? != Self::PREFIX {
            return None;
        }
        let action = match parts.next()? {
            "responded" => AdminAction::MarkResponded,
            "email" => AdminAction::ForwardToEmail,
            _ => return None,
        };
        let ticket_id = parts.next().filter(|id| !id.is_empty())?;
        Some((action, ticket_id))
    }
}

pub fn admin_keyboard(ticket_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![
            InlineKeyboardButton::callback(
                "Mark responded",
                AdminAction::MarkResponded.callback_data(ticket_id),
            ),
            InlineKeyboardButton::callback(
                "Forward to email",
                AdminAction::ForwardToEmail.callback_data(ticket_id),
            ),
        ]],
    }
}
