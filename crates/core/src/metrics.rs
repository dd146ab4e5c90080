//! Prometheus metrics for the support workflow.
//!
//! The server registers these through [`all_metrics`] alongside its own
//! HTTP metrics.

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts};

// =============================================================================
// Ticket lifecycle
// =============================================================================

/// Tickets created, by source ("bot", "web") and category.
pub static TICKETS_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("helpdesk_tickets_created_total", "Total tickets created"),
        &["source", "category"],
    )
    .unwrap()
});

/// Tickets that received their message.
pub static TICKETS_RECEIVED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "helpdesk_tickets_received_total",
        "Total tickets whose message was received",
    )
    .unwrap()
});

/// Tickets closed while still awaiting their message.
pub static TICKETS_ABANDONED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "helpdesk_tickets_abandoned_total",
            "Tickets closed before a message arrived",
        ),
        &["reason"], // "superseded", "expired"
    )
    .unwrap()
});

/// Status changes made by an administrator.
pub static STATUS_CHANGES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "helpdesk_ticket_status_changes_total",
            "Administrative ticket status changes",
        ),
        &["to_status"],
    )
    .unwrap()
});

// =============================================================================
// Forwarding and bot
// =============================================================================

/// Forwarding attempts to the admin channel, by result.
pub static FORWARDS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "helpdesk_forwards_total",
            "Ticket summaries forwarded to the admin channel",
        ),
        &["result"], // "success", "failure", "disabled"
    )
    .unwrap()
});

/// Bot updates processed, by kind.
pub static BOT_UPDATES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("helpdesk_bot_updates_total", "Bot updates dispatched"),
        &["kind"], // "command", "text", "photo", "callback", "other"
    )
    .unwrap()
});

/// Failed getUpdates calls.
pub static BOT_POLL_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "helpdesk_bot_poll_errors_total",
        "Failed long-poll requests to the Bot API",
    )
    .unwrap()
});

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(TICKETS_CREATED.clone()),
        Box::new(TICKETS_RECEIVED.clone()),
        Box::new(TICKETS_ABANDONED.clone()),
        Box::new(STATUS_CHANGES.clone()),
        Box::new(FORWARDS.clone()),
        Box::new(BOT_UPDATES.clone()),
        Box::new(BOT_POLL_ERRORS.clone()),
    ]
}
