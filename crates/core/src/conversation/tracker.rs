use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// A ticket waiting for the user's free-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTicket {
    pub ticket_id: String,
    pub since: DateTime<Utc>,
}

impl PendingTicket {
    fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        ttl.is_some_and(|ttl| now - self.since >= ttl)
    }
}

/// Tracks at most one pending ticket per user.
///
/// The tracker only holds ticket identifiers; the ticket store owns the
/// records. Entries older than the TTL are treated as absent and can be
/// collected with [`ConversationTracker::take_expired`].
#[derive(Debug)]
pub struct ConversationTracker {
    pending: Mutex<HashMap<String, PendingTicket>>,
    ttl: Option<Duration>,
}

impl ConversationTracker {
    /// Create a tracker whose entries never expire.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            ttl: None,
        }
    }

    /// Create a tracker whose entries expire after `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            ttl: Some(ttl),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, PendingTicket>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Point the user at `ticket_id`. Returns the entry it replaced, if any
    /// (expired or not).
    pub fn set_pending(&self, user_id: &str, ticket_id: &str) -> Option<PendingTicket> {
        self.entries().insert(
            user_id.to_string(),
            PendingTicket {
                ticket_id: ticket_id.to_string(),
                since: Utc::now(),
            },
        )
    }

    /// The user's pending ticket, unless missing or expired.
    pub fn get_pending(&self, user_id: &str) -> Option<String> {
        let now = Utc::now();
        self.entries()
            .get(user_id)
            .filter(|p| !p.is_expired(self.ttl, now))
            .map(|p| p.ticket_id.clone())
    }

    /// Forget the user's pending ticket. Returns the removed entry.
    pub fn clear_pending(&self, user_id: &str) -> Option<PendingTicket> {
        self.entries().remove(user_id)
    }

    /// Remove and return every expired entry as `(user_id, entry)`.
    pub fn take_expired(&self) -> Vec<(String, PendingTicket)> {
        if self.ttl.is_none() {
            return Vec::new();
        }

        let now = Utc::now();
        let mut entries = self.entries();

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, p)| p.is_expired(self.ttl, now))
            .map(|(user, _)| user.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|user| entries.remove(&user).map(|p| (user, p)))
            .collect()
    }

    /// Number of tracked entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConversationTracker {
    fn default() -> Self {
        Self::new()
    }
}
