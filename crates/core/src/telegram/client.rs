//! Telegram Bot API client over HTTPS.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::TelegramConfig;

use super::{
    ApiResponse, BotApi, BotApiError, GetUpdates, Message, SendMessage, SendPhoto, Update, User,
};

/// Bot API client.
pub struct TelegramClient {
    client: Client,
    api_url: String,
    token: String,
}

impl TelegramClient {
    /// Create a new client. The request timeout must exceed the long-poll timeout.
    pub fn new(config: &TelegramConfig) -> Result<Self, BotApiError> {
        let timeout = Duration::from_secs(
            u64::from(config.request_timeout_secs) + u64::from(config.poll_timeout_secs),
        );

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotApiError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    /// Call a Bot API method with a JSON body and unwrap the response envelope.
    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, BotApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BotApiError::Timeout
                } else {
                    // The URL contains the token and must not reach the logs.
                    BotApiError::ConnectionFailed(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| BotApiError::InvalidResponse(format!("HTTP {}: {}", status, e.without_url())))?;

        if !envelope.ok {
            return Err(BotApiError::Api {
                code: envelope.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: envelope
                    .description
                    .unwrap_or_else(|| "Unknown Bot API error".to_string()),
            });
        }

        debug!(method, "Bot API call succeeded");

        envelope
            .result
            .ok_or_else(|| BotApiError::InvalidResponse(format!("{}: missing result", method)))
    }
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn get_me(&self) -> Result<User, BotApiError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    async fn get_updates(&self, request: &GetUpdates) -> Result<Vec<Update>, BotApiError> {
        self.call("getUpdates", request).await
    }

    async fn send_message(&self, message: &SendMessage) -> Result<Message, BotApiError> {
        self.call("sendMessage", message).await
    }

    async fn send_photo(&self, photo: &SendPhoto) -> Result<Message, BotApiError> {
        self.call("sendPhoto", photo).await
    }

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<(), BotApiError> {
        let body = serde_json::json!({
            "callback_query_id": callback_query_id,
            "text": text,
        });
        let _: bool = self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }
}
