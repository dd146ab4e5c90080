use std::sync::Arc;

use tokio::sync::mpsc;

use super::{AuditEventEnvelope, AuditHandle, AuditRecord, AuditStore};

/// Background task draining the audit channel into an `AuditStore`.
pub struct AuditWriter {
    rx: mpsc::Receiver<AuditEventEnvelope>,
    store: Arc<dyn AuditStore>,
}

impl AuditWriter {
    pub fn new(rx: mpsc::Receiver<AuditEventEnvelope>, store: Arc<dyn AuditStore>) -> Self {
        Self { rx, store }
    }

    /// Consume events until every `AuditHandle` has been dropped.
    pub async fn run(mut self) {
        tracing::info!("Audit writer started");

        while let Some(envelope) = self.rx.recv().await {
            let event = envelope.event;
            let record = AuditRecord {
                id: 0,
                timestamp: envelope.timestamp,
                event_type: event.event_type().to_string(),
                ticket_id: event.ticket_id().map(String::from),
                user_id: event.user_id().map(String::from),
                data: event,
            };

            if let Err(e) = self.store.insert(&record) {
                tracing::error!(event_type = %record.event_type, "Failed to write audit event: {}", e);
            }
        }

        tracing::info!("Audit writer shutting down");
    }
}

/// Wire a handle to a writer over a channel of `buffer_size` events.
///
/// Spawn the writer with `tokio::spawn(writer.run())` and clone the handle
/// into every component that emits events.
pub fn create_audit_system(
    store: Arc<dyn AuditStore>,
    buffer_size: usize,
) -> (AuditHandle, AuditWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (AuditHandle::new(tx), AuditWriter::new(rx, store))
}
