use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};

use super::{AuditError, AuditEvent, AuditFilter, AuditRecord, AuditStore};

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS audit_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    event_type TEXT NOT NULL,
    ticket_id TEXT,
    user_id TEXT,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_events_timestamp ON audit_events(timestamp);
CREATE INDEX IF NOT EXISTS idx_audit_events_ticket_id ON audit_events(ticket_id);
CREATE INDEX IF NOT EXISTS idx_audit_events_event_type ON audit_events(event_type);
"#;

/// SQLite-backed audit store
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    /// Open (or create) the audit table in the database file at `path`.
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        let conn = Connection::open(path).map_err(|e| AuditError::Database(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Create an in-memory SQLite audit store (useful for testing)
    pub fn in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory().map_err(|e| AuditError::Database(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, AuditError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AuditError::Database(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AuditError> {
        self.conn
            .lock()
            .map_err(|_| AuditError::Database("audit connection lock poisoned".to_string()))
    }

    fn build_where_clause(filter: &AuditFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref ticket_id) = filter.ticket_id {
            conditions.push("ticket_id = ?");
            params.push(Box::new(ticket_id.clone()));
        }
        if let Some(ref event_type) = filter.event_type {
            conditions.push("event_type = ?");
            params.push(Box::new(event_type.clone()));
        }
        if let Some(ref user_id) = filter.user_id {
            conditions.push("user_id = ?");
            params.push(Box::new(user_id.clone()));
        }
        if let Some(ref from) = filter.from {
            conditions.push("timestamp >= ?");
            params.push(Box::new(format_timestamp(from)));
        }
        if let Some(ref to) = filter.to {
            conditions.push("timestamp <= ?");
            params.push(Box::new(format_timestamp(to)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn decode(row: RawRow) -> Result<AuditRecord, AuditError> {
        let (id, timestamp, event_type, ticket_id, user_id, data) = row;
        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| AuditError::Database(format!("Invalid timestamp: {}", e)))?
            .with_timezone(&Utc);
        let data: AuditEvent =
            serde_json::from_str(&data).map_err(|e| AuditError::Serialization(e.to_string()))?;

        Ok(AuditRecord {
            id,
            timestamp,
            event_type,
            ticket_id,
            user_id,
            data,
        })
    }
}

type RawRow = (i64, String, String, Option<String>, Option<String>, String);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

impl AuditStore for SqliteAuditStore {
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError> {
        let data_json = serde_json::to_string(&record.data)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO audit_events (timestamp, event_type, ticket_id, user_id, data) VALUES (?, ?, ?, ?, ?)",
            params![
                format_timestamp(&record.timestamp),
                record.event_type,
                record.ticket_id,
                record.user_id,
                data_json,
            ],
        )
        .map_err(|e| AuditError::Database(e.to_string()))?;

        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        let (where_clause, mut params) = Self::build_where_clause(filter);
        let sql = format!(
            "SELECT id, timestamp, event_type, ticket_id, user_id, data FROM audit_events {} \
             ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            where_clause
        );
        params.push(Box::new(filter.limit));
        params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AuditError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(param_refs.as_slice(), read_row)
            .map_err(|e| AuditError::Database(e.to_string()))?;

        rows.map(|row| {
            row.map_err(|e| AuditError::Database(e.to_string()))
                .and_then(Self::decode)
        })
        .collect()
    }

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError> {
        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM audit_events {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let conn = self.lock()?;
        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| AuditError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(event: AuditEvent) -> AuditRecord {
        AuditRecord {
            id: 0,
            timestamp: Utc::now(),
            event_type: event.event_type().to_string(),
            ticket_id: event.ticket_id().map(String::from),
            user_id: event.user_id().map(String::from),
            data: event,
        }
    }

    fn started() -> AuditRecord {
        record(AuditEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc123".to_string(),
            bot_username: Some("support_bot".to_string()),
        })
    }

    fn created(ticket_id: &str, user_id: &str) -> AuditRecord {
        record(AuditEvent::TicketCreated {
            ticket_id: ticket_id.to_string(),
            requester_id: user_id.to_string(),
            category: "technical".to_string(),
            source: "bot".to_string(),
        })
    }

    #[test]
    fn test_insert_and_query_roundtrips_payload() {
        let store = SqliteAuditStore::in_memory().unwrap();
        let id = store.insert(&created("1700000000000", "42")).unwrap();
        assert!(id > 0);

        let results = store.query(&AuditFilter::new()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
        assert_eq!(results[0].ticket_id.as_deref(), Some("1700000000000"));
        assert!(matches!(
            results[0].data,
            AuditEvent::TicketCreated { ref category, .. } if category == "technical"
        ));
    }

    #[test]
    fn test_filters() {
        let store = SqliteAuditStore::in_memory().unwrap();
        store.insert(&started()).unwrap();
        store.insert(&created("1", "42")).unwrap();
        store.insert(&created("2", "42")).unwrap();
        store.insert(&created("3", "7")).unwrap();

        let by_type = AuditFilter::new().with_event_type("ticket_created");
        assert_eq!(store.query(&by_type).unwrap().len(), 3);

        let by_ticket = AuditFilter::new().with_ticket_id("2");
        assert_eq!(store.query(&by_ticket).unwrap().len(), 1);

        let by_user = AuditFilter::new().with_user_id("42");
        assert_eq!(store.count(&by_user).unwrap(), 2);

        assert_eq!(store.count(&AuditFilter::new()).unwrap(), 4);
    }

    #[test]
    fn test_newest_first_and_pagination() {
        let store = SqliteAuditStore::in_memory().unwrap();
        let now = Utc::now();
        for i in 0..5 {
            let mut r = created(&i.to_string(), "42");
            r.timestamp = now + Duration::seconds(i);
            store.insert(&r).unwrap();
        }

        let page = store
            .query(&AuditFilter::new().with_limit(2).with_offset(0))
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].ticket_id.as_deref(), Some("4"));
        assert_eq!(page[1].ticket_id.as_deref(), Some("3"));

        let last = store
            .query(&AuditFilter::new().with_limit(2).with_offset(4))
            .unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].ticket_id.as_deref(), Some("0"));
    }

    #[test]
    fn test_time_range() {
        let store = SqliteAuditStore::in_memory().unwrap();
        let now = Utc::now();

        let mut old = started();
        old.timestamp = now - Duration::hours(2);
        store.insert(&old).unwrap();
        store.insert(&started()).unwrap();

        let filter = AuditFilter::new().with_time_range(Some(now - Duration::hours(1)), None);
        assert_eq!(store.query(&filter).unwrap().len(), 1);
    }

    #[test]
    fn test_file_store_shares_database_with_tickets() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("helpdesk.db");

        let tickets = crate::ticket::SqliteTicketStore::new(&db_path).unwrap();
        let store = SqliteAuditStore::new(&db_path).unwrap();
        store.insert(&started()).unwrap();
        drop(store);
        drop(tickets);

        let reopened = SqliteAuditStore::new(&db_path).unwrap();
        assert_eq!(reopened.count(&AuditFilter::new()).unwrap(), 1);
    }
}
