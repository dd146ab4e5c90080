//! In-process ticket store. Records live as long as the process.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;

use super::{
    is_valid_ticket_id, CreateTicketRequest, Ticket, TicketError, TicketFilter,
    TicketIdGenerator, TicketPatch, TicketStatus, TicketStore,
};

/// Ticket store backed by an ordered map.
///
/// Identifiers are time-based and strictly increasing, so iterating the map
/// yields tickets in creation order.
#[derive(Debug, Default)]
pub struct MemoryTicketStore {
    tickets: Mutex<BTreeMap<i64, Ticket>>,
    ids: TicketIdGenerator,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(id: &str) -> Option<i64> {
        if !is_valid_ticket_id(id) {
            return None;
        }
        id.parse().ok()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<i64, Ticket>>, TicketError> {
        self.tickets
            .lock()
            .map_err(|e| TicketError::Database(format!("ticket map poisoned: {}", e)))
    }
}

impl TicketStore for MemoryTicketStore {
    fn create(&self, request: CreateTicketRequest) -> Result<Ticket, TicketError> {
        let mut tickets = self.lock()?;

        let id = self.ids.next_id();
        let key = Self::key(&id).ok_or_else(|| TicketError::Database(id.clone()))?;
        let now = Utc::now();

        let ticket = Ticket {
            id,
            requester: request.requester,
            category: request.category,
            status: TicketStatus::AwaitingMessage,
            message: None,
            image_ref: None,
            source: request.source,
            created_at: now,
            updated_at: now,
        };

        tickets.insert(key, ticket.clone());
        Ok(ticket)
    }

    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError> {
        let tickets = self.lock()?;
        Ok(Self::key(id).and_then(|key| tickets.get(&key).cloned()))
    }

    fn update(&self, id: &str, patch: TicketPatch) -> Result<Ticket, TicketError> {
        let mut tickets = self.lock()?;

        let ticket = Self::key(id)
            .and_then(|key| tickets.get_mut(&key))
            .ok_or_else(|| TicketError::NotFound(id.to_string()))?;

        patch.apply(ticket, Utc::now())?;
        Ok(ticket.clone())
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        let tickets = self.lock()?;

        Ok(tickets
            .values()
            .filter(|t| filter.matches(t))
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        let tickets = self.lock()?;
        Ok(tickets.values().filter(|t| filter.matches(t)).count() as i64)
    }
}
