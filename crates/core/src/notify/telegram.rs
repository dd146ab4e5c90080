use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::telegram::{BotApi, SendMessage, SendPhoto};
use crate::ticket::Ticket;

use super::{admin_keyboard, format_ticket_summary, ForwardError, TicketForwarder};

/// Photo captions are limited to 1024 characters by the Bot API.
const MAX_CAPTION_CHARS: usize = 1024;

/// Posts ticket summaries to an admin chat through the Bot API.
pub struct TelegramForwarder {
    api: Arc<dyn BotApi>,
    chat_id: i64,
}

impl TelegramForwarder {
    pub fn new(api: Arc<dyn BotApi>, chat_id: i64) -> Self {
        Self { api, chat_id }
    }
}

#[async_trait]
impl TicketForwarder for TelegramForwarder {
    async fn forward(&self, ticket: &Ticket) -> Result<(), ForwardError> {
        let summary = format_ticket_summary(ticket);
        let keyboard = admin_keyboard(&ticket.id);

        match ticket.image_ref {
            Some(ref image_ref) => {
                let photo = SendPhoto {
                    chat_id: self.chat_id,
                    photo: image_ref.clone(),
                    caption: Some(truncate_chars(&summary, MAX_CAPTION_CHARS)),
                    reply_markup: Some(keyboard),
                };
                self.api.send_photo(&photo).await?;
            }
            None => {
                let message = SendMessage::new(self.chat_id, summary).with_keyboard(keyboard);
                self.api.send_message(&message).await?;
            }
        }

        info!(ticket_id = %ticket.id, chat_id = self.chat_id, "Ticket forwarded to admin chat");
        Ok(())
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::testing::MockBotApi;
    use crate::ticket::{Requester, TicketCategory, TicketSource, TicketStatus};

    fn ticket(image_ref: Option<&str>) -> Ticket {
        Ticket {
            id: "1700000000000".to_string(),
            requester: Requester::new("42", "Alice"),
            category: TicketCategory::Payment,
            status: TicketStatus::Received,
            message: Some("charged twice".to_string()),
            image_ref: image_ref.map(String::from),
            source: TicketSource::Bot,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_text_ticket_uses_send_message() {
        let api = Arc::new(MockBotApi::new());
        let forwarder = TelegramForwarder::new(api.clone(), -100);

        forwarder.forward(&ticket(None)).await.unwrap();

        let sent = api.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, -100);
        assert!(sent[0].text.contains("charged twice"));
        assert!(sent[0].reply_markup.is_some());
        assert!(api.sent_photos().is_empty());
    }

    #[tokio::test]
    async fn test_image_ticket_uses_send_photo() {
        let api = Arc::new(MockBotApi::new());
        let forwarder = TelegramForwarder::new(api.clone(), -100);

        forwarder.forward(&ticket(Some("photo-file"))).await.unwrap();

        let photos = api.sent_photos();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].photo, "photo-file");
        assert!(photos[0].caption.as_deref().unwrap().contains("Payment"));
        assert!(api.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_reported() {
        let api = Arc::new(MockBotApi::new());
        api.fail_sends(true);
        let forwarder = TelegramForwarder::new(api, -100);

        let result = forwarder.forward(&ticket(None)).await;
        assert!(matches!(result, Err(ForwardError::Delivery(_))));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
