//! Time-based ticket identifiers.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Number of digits in a ticket identifier.
pub const TICKET_ID_LEN: usize = 13;

/// Generates strictly increasing, time-based ticket identifiers.
///
/// An identifier is the current Unix time in milliseconds. When two tickets
/// are created within the same millisecond (or the clock steps back) the
/// previous value is bumped by one instead.
#[derive(Debug, Default)]
pub struct TicketIdGenerator {
    last: AtomicI64,
}

impl TicketIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator that never returns a value at or below `last`.
    pub fn starting_after(last: i64) -> Self {
        Self {
            last: AtomicI64::new(last),
        }
    }

    /// Returns the next identifier.
    pub fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange(prev, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return candidate.to_string(),
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Returns true if `code` has the shape of a ticket identifier.
pub fn is_valid_ticket_id(code: &str) -> bool {
    code.len() == TICKET_ID_LEN && code.bytes().all(|b| b.is_ascii_digit())
}
