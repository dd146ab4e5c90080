//! Display labels for category and status codes.
//!
//! Lookups never fail: an unknown code is returned as-is.

use super::{TicketCategory, TicketStatus};

impl TicketCategory {
    /// Human-readable label shown to requesters and admins.
    pub fn label(&self) -> &'static str {
        match self {
            TicketCategory::Technical => "Technical issue",
            TicketCategory::Account => "Account",
            TicketCategory::Payment => "Payment",
            TicketCategory::Suggestion => "Suggestion",
            TicketCategory::Other => "Other",
        }
    }
}

impl TicketStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TicketStatus::AwaitingMessage => "Awaiting message",
            TicketStatus::Received => "Received",
            TicketStatus::Responded => "Responded",
            TicketStatus::Closed => "Closed",
        }
    }
}

/// Label for a category code, or the code itself if it is not recognized.
pub fn category_label(code: &str) -> String {
    code.parse::<TicketCategory>()
        .map(|c| c.label().to_string())
        .unwrap_or_else(|raw| raw)
}

/// Label for a status code, or the code itself if it is not recognized.
pub fn status_label(code: &str) -> String {
    code.parse::<TicketStatus>()
        .map(|s| s.label().to_string())
        .unwrap_or_else(|raw| raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_category_labels() {
        assert_eq!(category_label("technical"), "Technical issue");
        assert_eq!(category_label("payment"), "Payment");
    }

    #[test]
    fn test_unknown_category_falls_back_to_code() {
        assert_eq!(category_label("billing"), "billing");
        assert_eq!(category_label(""), "");
        assert_eq!(category_label("Technical"), "Technical");
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label("awaiting_message"), "Awaiting message");
        assert_eq!(status_label("closed"), "Closed");
        assert_eq!(status_label("archived"), "archived");
    }
}
