//! SQLite-backed ticket store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{
    CreateTicketRequest, Requester, Ticket, TicketCategory, TicketError, TicketFilter,
    TicketIdGenerator, TicketPatch, TicketStatus, TicketStore,
};

const SELECT_COLUMNS: &str = "SELECT id, requester_id, requester_name, category, status, message, image_ref, source, created_at, updated_at FROM support_tickets";

/// SQLite-backed ticket store.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
    ids: TicketIdGenerator,
}

impl SqliteTicketStore {
    /// Create a new SQLite ticket store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TicketError> {
        let conn = Connection::open(path).map_err(|e| TicketError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Create an in-memory SQLite ticket store (useful for testing).
    pub fn in_memory() -> Result<Self, TicketError> {
        let conn =
            Connection::open_in_memory().map_err(|e| TicketError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, TicketError> {
        Self::initialize_schema(&conn)?;

        // Identifiers must keep increasing across restarts.
        let last_id: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(CAST(id AS INTEGER)), 0) FROM support_tickets",
                [],
                |row| row.get(0),
            )
            .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
            ids: TicketIdGenerator::starting_after(last_id),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TicketError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS support_tickets (
                id TEXT PRIMARY KEY,
                requester_id TEXT NOT NULL,
                requester_name TEXT NOT NULL,
                category TEXT NOT NULL,
                status TEXT NOT NULL,
                message TEXT,
                image_ref TEXT,
                source TEXT NOT NULL DEFAULT 'bot',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_support_tickets_requester ON support_tickets(requester_id);
            CREATE INDEX IF NOT EXISTS idx_support_tickets_status ON support_tickets(status);
            "#,
        )
        .map_err(|e| TicketError::Database(e.to_string()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, TicketError> {
        self.conn
            .lock()
            .map_err(|e| TicketError::Database(format!("connection poisoned: {}", e)))
    }

    fn build_where_clause(filter: &TicketFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref requester_id) = filter.requester_id {
            conditions.push("requester_id = ?");
            params.push(Box::new(requester_id.clone()));
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(category) = filter.category {
            conditions.push("category = ?");
            params.push(Box::new(category.as_str()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let id: String = row.get(0)?;
        let requester_id: String = row.get(1)?;
        let requester_name: String = row.get(2)?;
        let category_code: String = row.get(3)?;
        let status_code: String = row.get(4)?;
        let message: Option<String> = row.get(5)?;
        let image_ref: Option<String> = row.get(6)?;
        let source_code: String = row.get(7)?;
        let created_at_str: String = row.get(8)?;
        let updated_at_str: String = row.get(9)?;

        let category: TicketCategory = category_code.parse().map_err(|code| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("unknown category: {}", code).into(),
            )
        })?;

        let status: TicketStatus = status_code.parse().map_err(|code| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown status: {}", code).into(),
            )
        })?;

        Ok(Ticket {
            id,
            requester: Requester::new(requester_id, requester_name),
            category,
            status,
            message,
            image_ref,
            source: source_code.parse().unwrap_or_default(),
            created_at: Self::parse_timestamp(&created_at_str),
            updated_at: Self::parse_timestamp(&updated_at_str),
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<Ticket>, TicketError> {
        let result = conn.query_row(
            &format!("{} WHERE id = ?", SELECT_COLUMNS),
            params![id],
            Self::row_to_ticket,
        );

        match result {
            Ok(ticket) => Ok(Some(ticket)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(TicketError::Database(e.to_string())),
        }
    }
}

impl TicketStore for SqliteTicketStore {
    fn create(&self, request: CreateTicketRequest) -> Result<Ticket, TicketError> {
        let conn = self.lock()?;

        let id = self.ids.next_id();
        let now = Utc::now();
        let status = TicketStatus::AwaitingMessage;

        conn.execute(
            "INSERT INTO support_tickets (id, requester_id, requester_name, category, status, message, image_ref, source, created_at, updated_at) VALUES (?, ?, ?, ?, ?, NULL, NULL, ?, ?, ?)",
            params![
                id,
                request.requester.user_id,
                request.requester.display_name,
                request.category.as_str(),
                status.as_str(),
                request.source.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(Ticket {
            id,
            requester: request.requester,
            category: request.category,
            status,
            message: None,
            image_ref: None,
            source: request.source,
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError> {
        let conn = self.lock()?;
        Self::fetch(&conn, id)
    }

    fn update(&self, id: &str, patch: TicketPatch) -> Result<Ticket, TicketError> {
        let conn = self.lock()?;

        let mut ticket =
            Self::fetch(&conn, id)?.ok_or_else(|| TicketError::NotFound(id.to_string()))?;

        patch.apply(&mut ticket, Utc::now())?;

        conn.execute(
            "UPDATE support_tickets SET status = ?, message = ?, image_ref = ?, updated_at = ? WHERE id = ?",
            params![
                ticket.status.as_str(),
                ticket.message,
                ticket.image_ref,
                ticket.updated_at.to_rfc3339(),
                id,
            ],
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(ticket)
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "{} {} ORDER BY CAST(id AS INTEGER) ASC LIMIT ? OFFSET ?",
            SELECT_COLUMNS, where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_ticket)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| TicketError::Database(e.to_string()))
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!("SELECT COUNT(*) FROM support_tickets {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| TicketError::Database(e.to_string()))
    }
}
