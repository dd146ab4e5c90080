//! Mock Bot API for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::telegram::{
    BotApi, BotApiError, Chat, GetUpdates, Message, SendMessage, SendPhoto, Update, User,
};

/// A recorded `answerCallbackQuery` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCallbackAnswer {
    pub callback_query_id: String,
    pub text: Option<String>,
}

/// Mock implementation of the `BotApi` trait.
///
/// Provides controllable behavior for testing:
/// - Queue update batches (or poll errors) for `get_updates`
/// - Record outgoing messages, photos and callback answers
/// - Reject the token or fail every send
///
/// # Example
///
/// ```rust,ignore
/// use helpdesk_core::testing::{fixtures, MockBotApi};
///
/// let api = MockBotApi::new();
/// api.push_updates(vec![fixtures::text_update(1, 42, "/start")]);
///
/// // ... run the dispatcher or poller ...
///
/// assert_eq!(api.sent_messages().len(), 1);
/// ```
#[derive(Debug)]
pub struct MockBotApi {
    me: User,
    updates: Mutex<VecDeque<Result<Vec<Update>, BotApiError>>>,
    poll_requests: Mutex<Vec<GetUpdates>>,
    messages: Mutex<Vec<SendMessage>>,
    photos: Mutex<Vec<SendPhoto>>,
    callback_answers: Mutex<Vec<RecordedCallbackAnswer>>,
    reject_token: AtomicBool,
    fail_sends: AtomicBool,
    next_message_id: AtomicI64,
}

impl Default for MockBotApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBotApi {
    pub fn new() -> Self {
        Self {
            me: User {
                id: 1,
                is_bot: true,
                first_name: "Support".to_string(),
                last_name: None,
                username: Some("support_bot".to_string()),
            },
            updates: Mutex::new(VecDeque::new()),
            poll_requests: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            photos: Mutex::new(Vec::new()),
            callback_answers: Mutex::new(Vec::new()),
            reject_token: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            next_message_id: AtomicI64::new(1),
        }
    }

    /// Queue a batch returned by the next `get_updates` call.
    pub fn push_updates(&self, updates: Vec<Update>) {
        self.updates.lock().unwrap().push_back(Ok(updates));
    }

    /// Make the next `get_updates` call fail.
    pub fn push_poll_error(&self) {
        self.updates
            .lock()
            .unwrap()
            .push_back(Err(BotApiError::ConnectionFailed("mock outage".to_string())));
    }

    /// Make `get_me` answer like the API does for a bad token.
    pub fn reject_token(&self, reject: bool) {
        self.reject_token.store(reject, Ordering::SeqCst);
    }

    /// Make every send method fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Number of batches still queued.
    pub fn pending_batches(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn poll_requests(&self) -> Vec<GetUpdates> {
        self.poll_requests.lock().unwrap().clone()
    }

    pub fn sent_messages(&self) -> Vec<SendMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Texts of messages sent to `chat_id`, oldest first.
    pub fn texts_to(&self, chat_id: i64) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn sent_photos(&self) -> Vec<SendPhoto> {
        self.photos.lock().unwrap().clone()
    }

    pub fn callback_answers(&self) -> Vec<RecordedCallbackAnswer> {
        self.callback_answers.lock().unwrap().clone()
    }

    fn check_send(&self) -> Result<(), BotApiError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BotApiError::Api {
                code: 400,
                description: "Bad Request: chat not found".to_string(),
            });
        }
        Ok(())
    }

    fn sent(&self, chat_id: i64, text: Option<String>) -> Message {
        Message {
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
            from: Some(self.me.clone()),
            chat: Chat {
                id: chat_id,
                kind: "private".to_string(),
            },
            text,
            photo: None,
            caption: None,
        }
    }
}

#[async_trait]
impl BotApi for MockBotApi {
    async fn get_me(&self) -> Result<User, BotApiError> {
        if self.reject_token.load(Ordering::SeqCst) {
            return Err(BotApiError::Api {
                code: 401,
                description: "Unauthorized".to_string(),
            });
        }
        Ok(self.me.clone())
    }

    async fn get_updates(&self, request: &GetUpdates) -> Result<Vec<Update>, BotApiError> {
        self.poll_requests.lock().unwrap().push(request.clone());

        let next = self.updates.lock().unwrap().pop_front();
        match next {
            Some(batch) => batch,
            None => {
                // Stand-in for an empty long poll.
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn send_message(&self, message: &SendMessage) -> Result<Message, BotApiError> {
        self.check_send()?;
        self.messages.lock().unwrap().push(message.clone());
        Ok(self.sent(message.chat_id, Some(message.text.clone())))
    }

    async fn send_photo(&self, photo: &SendPhoto) -> Result<Message, BotApiError> {
        self.check_send()?;
        self.photos.lock().unwrap().push(photo.clone());
        Ok(self.sent(photo.chat_id, None))
    }

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<(), BotApiError> {
        self.callback_answers
            .lock()
            .unwrap()
            .push(RecordedCallbackAnswer {
                callback_query_id: callback_query_id.to_string(),
                text: text.map(String::from),
            });
        Ok(())
    }
}
