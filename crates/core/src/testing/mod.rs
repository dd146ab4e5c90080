//! Testing utilities and mock implementations.
//!
//! The mocks stand in for the Telegram Bot API and the admin forwarder so the
//! desk, the dispatcher and the HTTP API can be exercised without a network.
//!
//! # Example
//!
//! ```rust,ignore
//! use helpdesk_core::testing::{MockBotApi, MockForwarder};
//!
//! let api = MockBotApi::new();
//! let forwarder = MockForwarder::new();
//! forwarder.set_failing(true);
//! ```

mod mock_bot_api;
mod mock_forwarder;

pub use mock_bot_api::{MockBotApi, RecordedCallbackAnswer};
pub use mock_forwarder::MockForwarder;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::telegram::{CallbackQuery, Chat, Message, PhotoSize, Update, User};
    use crate::ticket::Requester;

    pub fn requester(user_id: &str) -> Requester {
        Requester::new(user_id, format!("User {}", user_id))
    }

    pub fn user(id: i64) -> User {
        User {
            id,
            is_bot: false,
            first_name: format!("User {}", id),
            last_name: None,
            username: None,
        }
    }

    fn private_message(message_id: i64, user_id: i64) -> Message {
        Message {
            message_id,
            from: Some(user(user_id)),
            chat: Chat {
                id: user_id,
                kind: "private".to_string(),
            },
            text: None,
            photo: None,
            caption: None,
        }
    }

    /// A private-chat text message from `user_id`.
    pub fn text_update(update_id: i64, user_id: i64, text: &str) -> Update {
        let mut message = private_message(update_id, user_id);
        message.text = Some(text.to_string());
        Update {
            update_id,
            message: Some(message),
            callback_query: None,
        }
    }

    /// A private-chat photo in two sizes; the large one has file id `file_id`.
    pub fn photo_update(update_id: i64, user_id: i64, file_id: &str) -> Update {
        let mut message = private_message(update_id, user_id);
        message.photo = Some(vec![
            PhotoSize {
                file_id: format!("{}-thumb", file_id),
                width: 90,
                height: 90,
                file_size: None,
            },
            PhotoSize {
                file_id: file_id.to_string(),
                width: 1280,
                height: 960,
                file_size: None,
            },
        ]);
        Update {
            update_id,
            message: Some(message),
            callback_query: None,
        }
    }

    /// A button press by `user_id` on a message in chat `chat_id`.
    pub fn callback_update(update_id: i64, user_id: i64, chat_id: i64, data: &str) -> Update {
        let mut message = private_message(update_id, user_id);
        message.chat.id = chat_id;
        Update {
            update_id,
            message: None,
            callback_query: Some(CallbackQuery {
                id: format!("cb-{}", update_id),
                from: user(user_id),
                message: Some(message),
                data: Some(data.to_string()),
            }),
        }
    }
}
