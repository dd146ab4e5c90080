//! Support tickets: data model, labels and storage backends.

mod catalog;
mod id;
mod memory_store;
mod sqlite_store;
mod store;
mod types;

pub use catalog::{category_label, status_label};
pub use id::{is_valid_ticket_id, TicketIdGenerator, TICKET_ID_LEN};
pub use memory_store::MemoryTicketStore;
pub use sqlite_store::SqliteTicketStore;
pub use store::{CreateTicketRequest, TicketError, TicketFilter, TicketPatch, TicketStore};
pub use types::{Requester, Ticket, TicketCategory, TicketSource, TicketStatus};
