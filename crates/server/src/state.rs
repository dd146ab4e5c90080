use std::sync::Arc;

use helpdesk_core::{
    AuditHandle, AuditStore, Authenticator, Config, SanitizedConfig, SupportDesk, TicketStore,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    audit: AuditHandle,
    audit_store: Arc<dyn AuditStore>,
    desk: Arc<SupportDesk>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        audit: AuditHandle,
        audit_store: Arc<dyn AuditStore>,
        desk: Arc<SupportDesk>,
    ) -> Self {
        Self {
            config,
            authenticator,
            audit,
            audit_store,
            desk,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn audit(&self) -> &AuditHandle {
        &self.audit
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }

    pub fn desk(&self) -> &SupportDesk {
        &self.desk
    }

    pub fn ticket_store(&self) -> &dyn TicketStore {
        self.desk.store().as_ref()
    }
}
