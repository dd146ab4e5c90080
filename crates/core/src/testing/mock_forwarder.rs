//! Mock ticket forwarder for testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::notify::{ForwardError, TicketForwarder};
use crate::telegram::BotApiError;
use crate::ticket::Ticket;

/// Records every forwarded ticket; can be switched to fail.
#[derive(Debug, Default)]
pub struct MockForwarder {
    forwarded: Mutex<Vec<Ticket>>,
    failing: AtomicBool,
}

impl MockForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every forward attempt from now on fails (still recorded).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Tickets passed to `forward`, including failed attempts.
    pub fn forwarded(&self) -> Vec<Ticket> {
        self.forwarded.lock().unwrap().clone()
    }

    pub fn forward_count(&self) -> usize {
        self.forwarded.lock().unwrap().len()
    }
}

#[async_trait]
impl TicketForwarder for MockForwarder {
    async fn forward(&self, ticket: &Ticket) -> Result<(), ForwardError> {
        self.forwarded.lock().unwrap().push(ticket.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(ForwardError::Delivery(BotApiError::Timeout));
        }
        Ok(())
    }
}
