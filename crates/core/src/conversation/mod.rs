//! Per-user conversation state: which ticket the user's next message belongs to.

mod tracker;

pub use tracker::{ConversationTracker, PendingTicket};
