pub mod audit;
pub mod auth;
pub mod bot;
pub mod config;
pub mod conversation;
pub mod metrics;
pub mod notify;
pub mod support;
pub mod telegram;
pub mod testing;
pub mod ticket;

pub use audit::{
    create_audit_system, AuditError, AuditEvent, AuditFilter, AuditHandle, AuditRecord,
    AuditStore, AuditWriter, SqliteAuditStore,
};
pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, NoneAuthenticator,
};
pub use bot::{BotDispatcher, BotPoller, PollerConfig};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthConfig, AuthMethod, Config,
    ConfigError, ConversationConfig, DatabaseConfig, SanitizedConfig, ServerConfig,
    StorageBackend, TelegramConfig,
};
pub use conversation::ConversationTracker;
pub use notify::{ForwardError, NoopForwarder, TelegramForwarder, TicketForwarder};
pub use support::{DeskError, Reply, SupportDesk};
pub use telegram::{BotApi, BotApiError, TelegramClient};
pub use ticket::{
    MemoryTicketStore, Requester, SqliteTicketStore, Ticket, TicketCategory, TicketError,
    TicketFilter, TicketSource, TicketStatus, TicketStore,
};
