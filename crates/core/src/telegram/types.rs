//! Types for the Telegram Bot API.
//!
//! Only the subset of the API the support bot uses is modeled. Unknown
//! fields are ignored on deserialization.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when talking to the Bot API.
#[derive(Debug, Error)]
pub enum BotApiError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    /// The API answered with `ok: false`.
    #[error("Bot API error ({code}): {description}")]
    Api { code: i64, description: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BotApiError {
    /// Returns true if the API rejected the bot token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BotApiError::Api { code: 401, .. } | BotApiError::Api { code: 404, .. })
    }
}

/// Response envelope shared by every Bot API method.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl User {
    /// Name shown in ticket summaries: first and last name, else the username.
    pub fn display_name(&self) -> String {
        let full = match self.last_name {
            Some(ref last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        };
        let full = full.trim();

        if !full.is_empty() {
            full.to_string()
        } else if let Some(ref username) = self.username {
            format!("@{}", username)
        } else {
            self.id.to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Available sizes of an attached photo, smallest first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Message {
    /// File id of the largest photo size, if the message carries a photo.
    pub fn largest_photo(&self) -> Option<&str> {
        self.photo
            .as_ref()?
            .iter()
            .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
            .map(|p| p.file_id.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: data.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// One button per row.
    pub fn single_column(buttons: Vec<InlineKeyboardButton>) -> Self {
        Self {
            inline_keyboard: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }
}

/// Outgoing text message.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SendMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl SendMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_markup: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboardMarkup) -> Self {
        self.reply_markup = Some(keyboard);
        self
    }
}

/// Outgoing photo, referenced by file id or URL.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SendPhoto {
    pub chat_id: i64,
    pub photo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

/// Long-poll parameters for `getUpdates`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u32,
    pub allowed_updates: Vec<String>,
}

/// Trait over the Bot API methods used by the support bot.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Returns the bot's own user. Fails if the token is rejected.
    async fn get_me(&self) -> Result<User, BotApiError>;

    async fn get_updates(&self, request: &GetUpdates) -> Result<Vec<Update>, BotApiError>;

    async fn send_message(&self, message: &SendMessage) -> Result<Message, BotApiError>;

    async fn send_photo(&self, photo: &SendPhoto) -> Result<Message, BotApiError>;

    /// Acknowledge a button press, optionally showing a short notice.
    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<(), BotApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_text_update() {
        let json = r#"{
            "update_id": 10,
            "message": {
                "message_id": 5,
                "from": {"id": 42, "is_bot": false, "first_name": "Alice", "language_code": "en"},
                "chat": {"id": 42, "type": "private"},
                "date": 1700000000,
                "text": "my app crashes"
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        let message = update.message.unwrap();
        assert_eq!(message.text.as_deref(), Some("my app crashes"));
        assert_eq!(message.from.unwrap().id, 42);
        assert_eq!(message.chat.kind, "private");
        assert!(update.callback_query.is_none());
    }

    #[test]
    fn test_largest_photo() {
        let json = r#"{
            "message_id": 6,
            "chat": {"id": 42, "type": "private"},
            "photo": [
                {"file_id": "small", "width": 90, "height": 60},
                {"file_id": "large", "width": 1280, "height": 853},
                {"file_id": "medium", "width": 320, "height": 213}
            ]
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.largest_photo(), Some("large"));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut user = User {
            id: 7,
            is_bot: false,
            first_name: "Alice".to_string(),
            last_name: Some("Smith".to_string()),
            username: Some("alice".to_string()),
        };
        assert_eq!(user.display_name(), "Alice Smith");

        user.first_name = String::new();
        user.last_name = None;
        assert_eq!(user.display_name(), "@alice");

        user.username = None;
        assert_eq!(user.display_name(), "7");
    }

    #[test]
    fn test_send_message_omits_empty_keyboard() {
        let json = serde_json::to_value(SendMessage::new(1, "hi")).unwrap();
        assert!(json.get("reply_markup").is_none());

        let keyboard =
            InlineKeyboardMarkup::single_column(vec![InlineKeyboardButton::callback("A", "a")]);
        let json = serde_json::to_value(SendMessage::new(1, "hi").with_keyboard(keyboard)).unwrap();
        assert_eq!(json["reply_markup"]["inline_keyboard"][0][0]["callback_data"], "a");
    }

    #[test]
    fn test_error_envelope() {
        let json = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let response: ApiResponse<User> = serde_json::from_str(json).unwrap();
        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(response.error_code, Some(401));
    }

    #[test]
    fn test_unauthorized_detection() {
        let err = BotApiError::Api {
            code: 401,
            description: "Unauthorized".to_string(),
        };
        assert!(err.is_unauthorized());
        assert!(!BotApiError::Timeout.is_unauthorized());
    }
}
