use chrono::{DateTime, Utc};
use thiserror::Error;

use super::AuditRecord;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Page size used when a filter does not set one.
pub const DEFAULT_AUDIT_LIMIT: i64 = 100;

/// Filter for querying audit events. All set fields must match.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub ticket_id: Option<String>,
    /// Snake-case event name, e.g. `ticket_abandoned`.
    pub event_type: Option<String>,
    /// Requester id, or the actor of a status change.
    pub user_id: Option<String>,
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_AUDIT_LIMIT,
            ..Default::default()
        }
    }

    /// Whether a record satisfies every condition (paging is not considered).
    pub fn matches(&self, record: &AuditRecord) -> bool {
        let eq = |wanted: &Option<String>, actual: Option<&str>| {
            wanted.as_deref().is_none_or(|w| actual == Some(w))
        };

        eq(&self.ticket_id, record.ticket_id.as_deref())
            && eq(&self.event_type, Some(record.event_type.as_str()))
            && eq(&self.user_id, record.user_id.as_deref())
            && self.from.is_none_or(|from| record.timestamp >= from)
            && self.to.is_none_or(|to| record.timestamp <= to)
    }

    pub fn with_ticket_id(mut self, ticket_id: impl Into<String>) -> Self {
        self.ticket_id = Some(ticket_id.into());
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_time_range(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Append-only storage for audit records.
pub trait AuditStore: Send + Sync {
    /// Append a record and return its row id.
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError>;

    /// Matching records, newest first, one page at a time.
    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError>;

    /// Number of matching records regardless of paging.
    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError>;
}
