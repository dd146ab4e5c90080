use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditHandle};
use crate::conversation::ConversationTracker;
use crate::metrics;
use crate::notify::TicketForwarder;
use crate::ticket::{
    is_valid_ticket_id, CreateTicketRequest, Requester, Ticket, TicketCategory, TicketError,
    TicketFilter, TicketPatch, TicketSource, TicketStatus, TicketStore,
};

use super::{DeskError, Reply};

/// The support workflow.
///
/// Every operation that reads and then writes ticket or tracker state runs
/// under one async lock, so the bot and the HTTP API never interleave inside
/// a read-modify-write sequence. Forwarding happens after the lock is
/// released.
pub struct SupportDesk {
    store: Arc<dyn TicketStore>,
    tracker: ConversationTracker,
    forwarder: Arc<dyn TicketForwarder>,
    audit: Option<AuditHandle>,
    lock: Mutex<()>,
}

impl SupportDesk {
    pub fn new(
        store: Arc<dyn TicketStore>,
        tracker: ConversationTracker,
        forwarder: Arc<dyn TicketForwarder>,
    ) -> Self {
        Self {
            store,
            tracker,
            forwarder,
            audit: None,
            lock: Mutex::new(()),
        }
    }

    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn store(&self) -> &Arc<dyn TicketStore> {
        &self.store
    }

    pub fn tracker(&self) -> &ConversationTracker {
        &self.tracker
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.try_emit(event);
        }
    }

    /// Greet the user and offer the categories.
    pub fn start(&self, requester: &Requester) -> Reply {
        debug!(user_id = %requester.user_id, "Conversation started");
        Reply::Welcome
    }

    /// Open a ticket in `category_code` and make it the user's pending ticket.
    ///
    /// A previously pending ticket that never received its message is closed.
    pub async fn select_category(
        &self,
        requester: &Requester,
        category_code: &str,
    ) -> Result<Reply, DeskError> {
        let Ok(category) = TicketCategory::from_str(category_code) else {
            return Ok(Reply::UnknownCategory {
                code: category_code.to_string(),
            });
        };

        let _guard = self.lock.lock().await;

        let ticket = self.create_ticket(requester, category, TicketSource::Bot)?;

        if let Some(previous) = self.tracker.set_pending(&requester.user_id, &ticket.id) {
            if let Err(e) = self.close_abandoned(&previous.ticket_id, "superseded") {
                warn!(
                    ticket_id = %previous.ticket_id,
                    error = %e,
                    "Failed to close superseded ticket"
                );
            }
        }

        Ok(Reply::AwaitingMessage { ticket })
    }

    /// Attach the user's text to their pending ticket and forward it.
    pub async fn attach_text(&self, requester: &Requester, text: &str) -> Result<Reply, DeskError> {
        let ticket = {
            let _guard = self.lock.lock().await;

            let Some(ticket_id) = self.tracker.get_pending(&requester.user_id) else {
                debug!(user_id = %requester.user_id, "Text without pending ticket ignored");
                return Ok(Reply::Ignored);
            };

            let text = text.trim();
            if text.is_empty() {
                return Ok(Reply::EmptyMessage);
            }

            let patch = TicketPatch::new()
                .with_message(text)
                .with_status(TicketStatus::Received);
            let ticket = match self.store.update(&ticket_id, patch) {
                Ok(ticket) => ticket,
                Err(e @ TicketError::Database(_)) => return Err(e.into()),
                Err(e) => {
                    // The pending entry points at a ticket that can no longer
                    // take a message; drop it.
                    warn!(ticket_id = %ticket_id, error = %e, "Stale pending ticket dropped");
                    self.tracker.clear_pending(&requester.user_id);
                    return Ok(Reply::Ignored);
                }
            };
            self.tracker.clear_pending(&requester.user_id);

            metrics::TICKETS_RECEIVED.inc();
            self.emit(AuditEvent::TicketReceived {
                ticket_id: ticket.id.clone(),
                requester_id: requester.user_id.clone(),
                has_image: ticket.image_ref.is_some(),
            });
            info!(ticket_id = %ticket.id, user_id = %requester.user_id, "Ticket received");

            ticket
        };

        self.forward(&ticket).await;
        Ok(Reply::Accepted { ticket })
    }

    /// Attach an image to the user's pending ticket. The status is unchanged.
    pub async fn attach_image(
        &self,
        requester: &Requester,
        image_ref: &str,
    ) -> Result<Reply, DeskError> {
        let _guard = self.lock.lock().await;

        let Some(ticket_id) = self.tracker.get_pending(&requester.user_id) else {
            debug!(user_id = %requester.user_id, "Image without pending ticket ignored");
            return Ok(Reply::Ignored);
        };

        match self
            .store
            .update(&ticket_id, TicketPatch::new().with_image_ref(image_ref))
        {
            Ok(ticket) => {
                self.emit(AuditEvent::ImageAttached {
                    ticket_id: ticket.id.clone(),
                    requester_id: requester.user_id.clone(),
                });
                Ok(Reply::ImageAttached { ticket })
            }
            Err(TicketError::AlreadyAttached { .. }) => Ok(Reply::ImageAlreadyAttached),
            Err(TicketError::NotFound(_)) => {
                self.tracker.clear_pending(&requester.user_id);
                Ok(Reply::Ignored)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every ticket the user opened, oldest first.
    pub fn my_tickets(&self, requester_id: &str) -> Result<Vec<Ticket>, DeskError> {
        let filter = TicketFilter::new()
            .with_requester(requester_id)
            .with_limit(i64::MAX);
        Ok(self.store.list(&filter)?)
    }

    /// Look up one of the user's tickets by its 13-digit code.
    pub fn ticket_status(&self, requester_id: &str, code: &str) -> Result<Reply, DeskError> {
        let code = code.trim();
        if !is_valid_ticket_id(code) {
            return Ok(Reply::MalformedCode {
                code: code.to_string(),
            });
        }

        // Other users' tickets are reported exactly like missing ones.
        match self.store.get(code)? {
            Some(ticket) if ticket.is_owned_by(requester_id) => Ok(Reply::Status { ticket }),
            _ => Ok(Reply::TicketNotFound {
                code: code.to_string(),
            }),
        }
    }

    /// Create a complete ticket from the web form and forward it.
    pub async fn submit_form(
        &self,
        requester: &Requester,
        category_code: &str,
        message: &str,
        image_ref: Option<&str>,
    ) -> Result<Ticket, DeskError> {
        let category = TicketCategory::from_str(category_code)
            .map_err(|code| DeskError::InvalidInput(format!("unknown category: {}", code)))?;
        let message = message.trim();
        if message.is_empty() {
            return Err(DeskError::InvalidInput("message must not be empty".to_string()));
        }
        if requester.user_id.trim().is_empty() {
            return Err(DeskError::InvalidInput(
                "requester user id must not be empty".to_string(),
            ));
        }
        let image_ref = image_ref.map(str::trim).filter(|r| !r.is_empty());

        let ticket = {
            let _guard = self.lock.lock().await;

            let ticket = self.create_ticket(requester, category, TicketSource::Web)?;
            let mut patch = TicketPatch::new()
                .with_message(message)
                .with_status(TicketStatus::Received);
            if let Some(image_ref) = image_ref {
                patch = patch.with_image_ref(image_ref);
            }
            let ticket = self.store.update(&ticket.id, patch)?;

            metrics::TICKETS_RECEIVED.inc();
            self.emit(AuditEvent::TicketReceived {
                ticket_id: ticket.id.clone(),
                requester_id: requester.user_id.clone(),
                has_image: ticket.image_ref.is_some(),
            });
            info!(ticket_id = %ticket.id, user_id = %requester.user_id, "Web form ticket received");

            ticket
        };

        self.forward(&ticket).await;
        Ok(ticket)
    }

    /// Administrative status change, validated against the transition table.
    pub async fn set_status(
        &self,
        ticket_id: &str,
        status: TicketStatus,
        actor: &str,
    ) -> Result<Ticket, DeskError> {
        let _guard = self.lock.lock().await;

        let before = self
            .store
            .get(ticket_id)?
            .ok_or_else(|| TicketError::NotFound(ticket_id.to_string()))?;

        // Only the requester's message moves a ticket to `received`.
        if !matches!(status, TicketStatus::Responded | TicketStatus::Closed) {
            return Err(TicketError::InvalidTransition {
                ticket_id: before.id,
                from: before.status,
                to: status,
            }
            .into());
        }

        let ticket = self
            .store
            .update(ticket_id, TicketPatch::new().with_status(status))?;

        if ticket.status == TicketStatus::Closed {
            let user_id = &ticket.requester.user_id;
            if self.tracker.get_pending(user_id).as_deref() == Some(ticket.id.as_str()) {
                self.tracker.clear_pending(user_id);
            }
        }

        metrics::STATUS_CHANGES
            .with_label_values(&[status.as_str()])
            .inc();
        self.emit(AuditEvent::TicketStatusChanged {
            ticket_id: ticket.id.clone(),
            changed_by: actor.to_string(),
            from_status: before.status.as_str().to_string(),
            to_status: ticket.status.as_str().to_string(),
        });
        info!(
            ticket_id = %ticket.id,
            from = %before.status,
            to = %ticket.status,
            actor,
            "Ticket status changed"
        );

        Ok(ticket)
    }

    /// Close tickets whose pending entry outlived the TTL. Returns how many
    /// were closed.
    pub async fn expire_pending(&self) -> usize {
        let _guard = self.lock.lock().await;

        let mut closed = 0;
        for (user_id, pending) in self.tracker.take_expired() {
            match self.close_abandoned(&pending.ticket_id, "expired") {
                Ok(true) => {
                    closed += 1;
                    info!(ticket_id = %pending.ticket_id, user_id = %user_id, "Pending ticket expired");
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(ticket_id = %pending.ticket_id, error = %e, "Failed to close expired ticket")
                }
            }
        }
        closed
    }

    fn create_ticket(
        &self,
        requester: &Requester,
        category: TicketCategory,
        source: TicketSource,
    ) -> Result<Ticket, DeskError> {
        let ticket = self.store.create(CreateTicketRequest {
            requester: requester.clone(),
            category,
            source,
        })?;

        metrics::TICKETS_CREATED
            .with_label_values(&[source.as_str(), category.as_str()])
            .inc();
        self.emit(AuditEvent::TicketCreated {
            ticket_id: ticket.id.clone(),
            requester_id: requester.user_id.clone(),
            category: category.as_str().to_string(),
            source: source.as_str().to_string(),
        });
        info!(
            ticket_id = %ticket.id,
            user_id = %requester.user_id,
            category = %category,
            source = source.as_str(),
            "Ticket created"
        );

        Ok(ticket)
    }

    /// Close `ticket_id` if it is still awaiting its message. Returns whether
    /// it was closed.
    fn close_abandoned(&self, ticket_id: &str, reason: &str) -> Result<bool, TicketError> {
        let Some(ticket) = self.store.get(ticket_id)? else {
            return Ok(false);
        };
        if ticket.status != TicketStatus::AwaitingMessage {
            return Ok(false);
        }

        self.store
            .update(ticket_id, TicketPatch::new().with_status(TicketStatus::Closed))?;

        metrics::TICKETS_ABANDONED.with_label_values(&[reason]).inc();
        self.emit(AuditEvent::TicketAbandoned {
            ticket_id: ticket_id.to_string(),
            requester_id: ticket.requester.user_id,
            reason: reason.to_string(),
        });
        Ok(true)
    }

    /// Best-effort delivery to the admin channel.
    async fn forward(&self, ticket: &Ticket) {
        if !self.forwarder.is_enabled() {
            metrics::FORWARDS.with_label_values(&["disabled"]).inc();
            return;
        }

        match self.forwarder.forward(ticket).await {
            Ok(()) => {
                metrics::FORWARDS.with_label_values(&["success"]).inc();
                self.emit(AuditEvent::TicketForwarded {
                    ticket_id: ticket.id.clone(),
                    with_image: ticket.image_ref.is_some(),
                });
            }
            Err(e) => {
                metrics::FORWARDS.with_label_values(&["failure"]).inc();
                warn!(ticket_id = %ticket.id, error = %e, "Failed to forward ticket to admin chat");
                self.emit(AuditEvent::TicketForwardFailed {
                    ticket_id: ticket.id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::testing::{fixtures::requester, MockForwarder};
    use crate::ticket::MemoryTicketStore;

    struct Fixture {
        desk: SupportDesk,
        forwarder: Arc<MockForwarder>,
    }

    fn fixture_with_tracker(tracker: ConversationTracker) -> Fixture {
        let forwarder = Arc::new(MockForwarder::new());
        let desk = SupportDesk::new(
            Arc::new(MemoryTicketStore::new()),
            tracker,
            forwarder.clone(),
        );
        Fixture { desk, forwarder }
    }

    fn fixture() -> Fixture {
        fixture_with_tracker(ConversationTracker::new())
    }

    fn ticket_of(reply: Reply) -> Ticket {
        match reply {
            Reply::AwaitingMessage { ticket }
            | Reply::Accepted { ticket }
            | Reply::ImageAttached { ticket }
            | Reply::Status { ticket } => ticket,
            other => panic!("expected a ticket reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_selecting_category_creates_awaiting_ticket() {
        let f = fixture();
        let alice = requester("A");

        let ticket = ticket_of(f.desk.select_category(&alice, "technical").await.unwrap());

        assert_eq!(ticket.status, TicketStatus::AwaitingMessage);
        assert_eq!(ticket.category, TicketCategory::Technical);
        assert!(ticket.is_owned_by("A"));
        assert_eq!(f.desk.tracker().get_pending("A"), Some(ticket.id.clone()));
        assert_eq!(f.desk.my_tickets("A").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_category_is_rejected_without_mutation() {
        let f = fixture();
        let alice = requester("A");

        let reply = f.desk.select_category(&alice, "billing").await.unwrap();

        assert_eq!(
            reply,
            Reply::UnknownCategory {
                code: "billing".to_string()
            }
        );
        assert!(f.desk.my_tickets("A").unwrap().is_empty());
        assert!(f.desk.tracker().get_pending("A").is_none());
    }

    #[tokio::test]
    async fn test_text_without_pending_ticket_is_ignored() {
        let f = fixture();
        let reply = f.desk.attach_text(&requester("A"), "hello").await.unwrap();
        assert_eq!(reply, Reply::Ignored);
        assert_eq!(f.forwarder.forward_count(), 0);
    }

    #[tokio::test]
    async fn test_support_scenario() {
        let f = fixture();
        let alice = requester("A");

        let t1 = ticket_of(f.desk.select_category(&alice, "technical").await.unwrap());

        let accepted = ticket_of(f.desk.attach_text(&alice, "my app crashes").await.unwrap());
        assert_eq!(accepted.id, t1.id);
        assert_eq!(accepted.status, TicketStatus::Received);
        assert_eq!(accepted.message.as_deref(), Some("my app crashes"));
        assert_eq!(f.forwarder.forward_count(), 1);
        assert!(f.desk.tracker().get_pending("A").is_none());

        let t2 = ticket_of(f.desk.select_category(&alice, "payment").await.unwrap());
        assert_ne!(t2.id, t1.id);
        assert_eq!(f.desk.tracker().get_pending("A"), Some(t2.id.clone()));

        let t1_now = f.desk.store().get(&t1.id).unwrap().unwrap();
        assert_eq!(t1_now.status, TicketStatus::Received);

        let mine = f.desk.my_tickets("A").unwrap();
        let ids: Vec<_> = mine.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![t1.id, t2.id]);
    }

    #[tokio::test]
    async fn test_second_text_is_not_attached() {
        let f = fixture();
        let alice = requester("A");
        f.desk.select_category(&alice, "account").await.unwrap();
        f.desk.attach_text(&alice, "first").await.unwrap();

        let reply = f.desk.attach_text(&alice, "second").await.unwrap();

        assert_eq!(reply, Reply::Ignored);
        let tickets = f.desk.my_tickets("A").unwrap();
        assert_eq!(tickets[0].message.as_deref(), Some("first"));
        assert_eq!(f.forwarder.forward_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_keeps_ticket_pending() {
        let f = fixture();
        let alice = requester("A");
        let t = ticket_of(f.desk.select_category(&alice, "other").await.unwrap());

        let reply = f.desk.attach_text(&alice, "   \n").await.unwrap();

        assert_eq!(reply, Reply::EmptyMessage);
        assert_eq!(f.desk.tracker().get_pending("A"), Some(t.id.clone()));
        let stored = f.desk.store().get(&t.id).unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::AwaitingMessage);
    }

    #[tokio::test]
    async fn test_forward_failure_still_acknowledges() {
        let f = fixture();
        f.forwarder.set_failing(true);
        let alice = requester("A");
        f.desk.select_category(&alice, "technical").await.unwrap();

        let reply = f.desk.attach_text(&alice, "help").await.unwrap();

        assert!(matches!(reply, Reply::Accepted { .. }));
        assert_eq!(f.forwarder.forward_count(), 1);
        assert_eq!(
            f.desk.my_tickets("A").unwrap()[0].status,
            TicketStatus::Received
        );
    }

    #[tokio::test]
    async fn test_reselection_closes_abandoned_ticket() {
        let f = fixture();
        let alice = requester("A");
        let t1 = ticket_of(f.desk.select_category(&alice, "technical").await.unwrap());
        let t2 = ticket_of(f.desk.select_category(&alice, "payment").await.unwrap());

        let t1_now = f.desk.store().get(&t1.id).unwrap().unwrap();
        assert_eq!(t1_now.status, TicketStatus::Closed);
        assert_eq!(f.desk.tracker().get_pending("A"), Some(t2.id.clone()));

        let accepted = ticket_of(f.desk.attach_text(&alice, "charged twice").await.unwrap());
        assert_eq!(accepted.id, t2.id);
    }

    #[tokio::test]
    async fn test_pending_is_per_user() {
        let f = fixture();
        let alice = requester("A");
        let bob = requester("B");
        let ta = ticket_of(f.desk.select_category(&alice, "technical").await.unwrap());
        let tb = ticket_of(f.desk.select_category(&bob, "account").await.unwrap());

        let accepted = ticket_of(f.desk.attach_text(&bob, "locked out").await.unwrap());
        assert_eq!(accepted.id, tb.id);
        assert_eq!(f.desk.tracker().get_pending("A"), Some(ta.id));
        assert!(f.desk.my_tickets("B").unwrap().iter().all(|t| t.is_owned_by("B")));
    }

    #[tokio::test]
    async fn test_image_attaches_once() {
        let f = fixture();
        let alice = requester("A");
        let t = ticket_of(f.desk.select_category(&alice, "technical").await.unwrap());

        let attached = ticket_of(f.desk.attach_image(&alice, "file-1").await.unwrap());
        assert_eq!(attached.image_ref.as_deref(), Some("file-1"));
        assert_eq!(attached.status, TicketStatus::AwaitingMessage);

        let again = f.desk.attach_image(&alice, "file-2").await.unwrap();
        assert_eq!(again, Reply::ImageAlreadyAttached);

        let accepted = ticket_of(f.desk.attach_text(&alice, "see screenshot").await.unwrap());
        assert_eq!(accepted.id, t.id);
        assert_eq!(accepted.image_ref.as_deref(), Some("file-1"));
        assert_eq!(
            f.forwarder.forwarded()[0].image_ref.as_deref(),
            Some("file-1")
        );
    }

    #[tokio::test]
    async fn test_image_without_pending_is_ignored() {
        let f = fixture();
        let reply = f.desk.attach_image(&requester("A"), "file-1").await.unwrap();
        assert_eq!(reply, Reply::Ignored);
    }

    #[tokio::test]
    async fn test_ticket_status_checks_code_and_owner() {
        let f = fixture();
        let alice = requester("A");
        let t = ticket_of(f.desk.select_category(&alice, "technical").await.unwrap());

        let status = ticket_of(f.desk.ticket_status("A", &t.id).unwrap());
        assert_eq!(status.id, t.id);

        assert_eq!(
            f.desk.ticket_status("B", &t.id).unwrap(),
            Reply::TicketNotFound { code: t.id.clone() }
        );
        assert!(matches!(
            f.desk.ticket_status("A", "12345").unwrap(),
            Reply::MalformedCode { .. }
        ));
        assert!(matches!(
            f.desk.ticket_status("A", "17000000000ab").unwrap(),
            Reply::MalformedCode { .. }
        ));
        assert!(matches!(
            f.desk.ticket_status("A", "1000000000000").unwrap(),
            Reply::TicketNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_submit_form_creates_received_ticket() {
        let f = fixture();
        let web = Requester::new("web:alice@example.com", "Alice");

        let ticket = f
            .desk
            .submit_form(&web, "payment", " charged twice ", Some("https://img/1.png"))
            .await
            .unwrap();

        assert_eq!(ticket.status, TicketStatus::Received);
        assert_eq!(ticket.source, TicketSource::Web);
        assert_eq!(ticket.message.as_deref(), Some("charged twice"));
        assert_eq!(ticket.image_ref.as_deref(), Some("https://img/1.png"));
        assert_eq!(f.forwarder.forward_count(), 1);
        assert!(f.desk.tracker().is_empty());
    }

    #[tokio::test]
    async fn test_submit_form_rejects_bad_input() {
        let f = fixture();
        let web = Requester::new("w1", "Web");

        let err = f.desk.submit_form(&web, "nope", "text", None).await.unwrap_err();
        assert!(matches!(err, DeskError::InvalidInput(_)));

        let err = f.desk.submit_form(&web, "other", "  ", None).await.unwrap_err();
        assert!(matches!(err, DeskError::InvalidInput(_)));

        assert!(f.desk.my_tickets("w1").unwrap().is_empty());
        assert_eq!(f.forwarder.forward_count(), 0);
    }

    #[tokio::test]
    async fn test_set_status_follows_transitions() {
        let f = fixture();
        let alice = requester("A");
        f.desk.select_category(&alice, "technical").await.unwrap();
        let t = ticket_of(f.desk.attach_text(&alice, "help").await.unwrap());

        let responded = f
            .desk
            .set_status(&t.id, TicketStatus::Responded, "admin")
            .await
            .unwrap();
        assert_eq!(responded.status, TicketStatus::Responded);

        let err = f
            .desk
            .set_status(&t.id, TicketStatus::Received, "admin")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeskError::Ticket(TicketError::InvalidTransition { .. })
        ));

        let err = f
            .desk
            .set_status("1000000000000", TicketStatus::Closed, "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, DeskError::Ticket(TicketError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_admin_cannot_mark_pending_ticket_received() {
        let f = fixture();
        let alice = requester("A");
        let t = ticket_of(f.desk.select_category(&alice, "technical").await.unwrap());

        let err = f
            .desk
            .set_status(&t.id, TicketStatus::Received, "api:admin")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeskError::Ticket(TicketError::InvalidTransition { .. })
        ));
        assert_eq!(f.desk.tracker().get_pending("A"), Some(t.id.clone()));

        let accepted = ticket_of(f.desk.attach_text(&alice, "my app crashes").await.unwrap());
        assert_eq!(accepted.id, t.id);
        assert_eq!(accepted.status, TicketStatus::Received);
        assert_eq!(accepted.message.as_deref(), Some("my app crashes"));
        assert_eq!(f.forwarder.forward_count(), 1);
    }

    #[tokio::test]
    async fn test_closing_pending_ticket_clears_tracker() {
        let f = fixture();
        let alice = requester("A");
        let t = ticket_of(f.desk.select_category(&alice, "technical").await.unwrap());

        f.desk
            .set_status(&t.id, TicketStatus::Closed, "admin")
            .await
            .unwrap();

        assert!(f.desk.tracker().get_pending("A").is_none());
        assert_eq!(f.desk.attach_text(&alice, "late").await.unwrap(), Reply::Ignored);
    }

    #[tokio::test]
    async fn test_expired_pending_is_ignored_and_closed() {
        let f = fixture_with_tracker(ConversationTracker::with_ttl(Duration::zero()));
        let alice = requester("A");
        let t = ticket_of(f.desk.select_category(&alice, "technical").await.unwrap());

        assert_eq!(f.desk.attach_text(&alice, "too late").await.unwrap(), Reply::Ignored);

        assert_eq!(f.desk.expire_pending().await, 1);
        let stored = f.desk.store().get(&t.id).unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::Closed);
        assert!(stored.message.is_none());
        assert_eq!(f.desk.expire_pending().await, 0);
    }

    #[tokio::test]
    async fn test_audit_events_are_emitted() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(16);
        let forwarder = Arc::new(MockForwarder::new());
        let desk = SupportDesk::new(
            Arc::new(MemoryTicketStore::new()),
            ConversationTracker::new(),
            forwarder,
        )
        .with_audit(AuditHandle::new(tx));
        let alice = requester("A");

        desk.select_category(&alice, "technical").await.unwrap();
        desk.attach_text(&alice, "help").await.unwrap();

        let mut types = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            types.push(envelope.event.event_type());
        }
        assert_eq!(
            types,
            vec!["ticket_created", "ticket_received", "ticket_forwarded"]
        );
    }
}
