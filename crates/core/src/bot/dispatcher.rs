use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::metrics;
use crate::notify::AdminAction;
use crate::support::{DeskError, Reply, SupportDesk, CATEGORY_CALLBACK_PREFIX};
use crate::telegram::{BotApi, CallbackQuery, Message, SendMessage, Update, User};
use crate::ticket::{Requester, TicketStatus};

const UNKNOWN_COMMAND: &str = "Unknown command. Send /start to open a ticket, /mytickets to list \
                               your tickets or /status <number> to check one.";
const INTERNAL_ERROR: &str = "Something went wrong on our side. Please try again later.";

/// Routes bot updates to the support desk and sends the replies.
pub struct BotDispatcher {
    api: Arc<dyn BotApi>,
    desk: Arc<SupportDesk>,
    admin_chat_id: Option<i64>,
}

impl BotDispatcher {
    pub fn new(api: Arc<dyn BotApi>, desk: Arc<SupportDesk>, admin_chat_id: Option<i64>) -> Self {
        Self {
            api,
            desk,
            admin_chat_id,
        }
    }

    pub fn desk(&self) -> &Arc<SupportDesk> {
        &self.desk
    }

    /// Handle one update. Errors are logged, never returned.
    pub async fn dispatch(&self, update: Update) {
        if let Some(callback) = update.callback_query {
            metrics::BOT_UPDATES.with_label_values(&["callback"]).inc();
            self.handle_callback(callback).await;
        } else if let Some(message) = update.message {
            self.handle_message(message).await;
        } else {
            metrics::BOT_UPDATES.with_label_values(&["other"]).inc();
            debug!(update_id = update.update_id, "Ignoring unsupported update");
        }
    }

    async fn handle_message(&self, message: Message) {
        let Some(ref from) = message.from else {
            return;
        };
        // Only one-to-one conversations open tickets.
        if message.chat.kind != "private" {
            metrics::BOT_UPDATES.with_label_values(&["other"]).inc();
            debug!(chat_id = message.chat.id, "Ignoring message outside a private chat");
            return;
        }

        let chat_id = message.chat.id;
        let requester = requester_of(from);

        if let Some(file_id) = message.largest_photo() {
            metrics::BOT_UPDATES.with_label_values(&["photo"]).inc();
            let result = self.desk.attach_image(&requester, file_id).await;
            let pending = matches!(
                result,
                Ok(Reply::ImageAttached { .. } | Reply::ImageAlreadyAttached)
            );
            self.reply(chat_id, result).await;

            // A caption is the ticket text sent together with the image, even
            // when the image itself was refused.
            if let Some(caption) = message.caption.as_deref().filter(|c| !c.trim().is_empty()) {
                if pending {
                    let result = self.desk.attach_text(&requester, caption).await;
                    self.reply(chat_id, result).await;
                }
            }
            return;
        }

        let Some(text) = message.text.as_deref() else {
            metrics::BOT_UPDATES.with_label_values(&["other"]).inc();
            return;
        };

        if text.starts_with('/') {
            metrics::BOT_UPDATES.with_label_values(&["command"]).inc();
            self.handle_command(chat_id, &requester, text).await;
        } else {
            metrics::BOT_UPDATES.with_label_values(&["text"]).inc();
            let result = self.desk.attach_text(&requester, text).await;
            self.reply(chat_id, result).await;
        }
    }

    async fn handle_command(&self, chat_id: i64, requester: &Requester, text: &str) {
        let (command, args) = match text.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (text, ""),
        };
        // Commands in groups may carry the bot name: /start@support_bot
        let command = command.split('@').next().unwrap_or(command);

        let result = match command {
            "/start" => Ok(self.desk.start(requester)),
            "/mytickets" => self
                .desk
                .my_tickets(&requester.user_id)
                .map(|tickets| Reply::Tickets { tickets }),
            "/status" => self.desk.ticket_status(&requester.user_id, args),
            _ => {
                self.send(SendMessage::new(chat_id, UNKNOWN_COMMAND)).await;
                return;
            }
        };
        self.reply(chat_id, result).await;
    }

    async fn handle_callback(&self, callback: CallbackQuery) {
        let data = callback.data.as_deref().unwrap_or_default();
        let chat_id = callback
            .message
            .as_ref()
            .map(|m| m.chat.id)
            .unwrap_or(callback.from.id);

        if let Some(code) = data.strip_prefix(CATEGORY_CALLBACK_PREFIX) {
            self.answer(&callback.id, None).await;
            let requester = requester_of(&callback.from);
            let result = self.desk.select_category(&requester, code).await;
            self.reply(chat_id, result).await;
            return;
        }

        if let Some((action, ticket_id)) = AdminAction::parse(data) {
            let notice = self.handle_admin_action(chat_id, &callback.from, action, ticket_id).await;
            self.answer(&callback.id, Some(&notice)).await;
            return;
        }

        debug!(data, "Unknown callback data");
        self.answer(&callback.id, None).await;
    }

    /// Returns the notice shown to the admin who pressed the button.
    async fn handle_admin_action(
        &self,
        chat_id: i64,
        admin: &User,
        action: AdminAction,
        ticket_id: &str,
    ) -> String {
        if self.admin_chat_id != Some(chat_id) {
            warn!(chat_id, user_id = admin.id, "Admin action outside the admin chat rejected");
            return "Not allowed".to_string();
        }

        match action {
            AdminAction::MarkResponded => {
                let actor = format!("telegram:{}", admin.id);
                match self
                    .desk
                    .set_status(ticket_id, TicketStatus::Responded, &actor)
                    .await
                {
                    Ok(_) => format!("Ticket #{} marked as responded", ticket_id),
                    Err(DeskError::Ticket(e)) => e.to_string(),
                    Err(e) => {
                        error!(ticket_id, error = %e, "Admin status change failed");
                        INTERNAL_ERROR.to_string()
                    }
                }
            }
            AdminAction::ForwardToEmail => "Forwarding to email is not available".to_string(),
        }
    }

    async fn reply(&self, chat_id: i64, result: Result<Reply, DeskError>) {
        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                error!(chat_id, error = %e, "Support desk operation failed");
                self.send(SendMessage::new(chat_id, INTERNAL_ERROR)).await;
                return;
            }
        };

        let Some(text) = reply.text() else {
            return;
        };
        let mut message = SendMessage::new(chat_id, text);
        if let Some(keyboard) = reply.keyboard() {
            message = message.with_keyboard(keyboard);
        }
        self.send(message).await;
    }

    async fn send(&self, message: SendMessage) {
        if let Err(e) = self.api.send_message(&message).await {
            warn!(chat_id = message.chat_id, error = %e, "Failed to send bot reply");
        }
    }

    async fn answer(&self, callback_query_id: &str, text: Option<&str>) {
        if let Err(e) = self.api.answer_callback_query(callback_query_id, text).await {
            warn!(error = %e, "Failed to answer callback query");
        }
    }
}

fn requester_of(user: &User) -> Requester {
    Requester::new(user.id.to_string(), user.display_name())
}
