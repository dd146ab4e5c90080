use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use helpdesk_core::{
    create_audit_system, create_authenticator, load_config, validate_config, AuditEvent,
    AuditStore, Authenticator, BotApi, BotDispatcher, BotPoller, ConversationTracker,
    MemoryTicketStore, NoopForwarder, PollerConfig, SqliteAuditStore, SqliteTicketStore,
    StorageBackend, SupportDesk, TelegramClient, TelegramForwarder, TicketForwarder, TicketStore,
};
use helpdesk_server::{create_router, AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for audit event channel
const AUDIT_BUFFER_SIZE: usize = 1000;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("HELPDESK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Storage backend: {:?}", config.database.backend);

    // Compute config hash for audit
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    let (ticket_store, audit_store): (Arc<dyn TicketStore>, Arc<dyn AuditStore>) =
        match config.database.backend {
            StorageBackend::Sqlite => {
                info!("Database path: {:?}", config.database.path);
                (
                    Arc::new(
                        SqliteTicketStore::new(&config.database.path)
                            .context("Failed to create ticket store")?,
                    ),
                    Arc::new(
                        SqliteAuditStore::new(&config.database.path)
                            .context("Failed to create audit store")?,
                    ),
                )
            }
            StorageBackend::Memory => {
                warn!("Using in-memory storage, tickets are lost on restart");
                (
                    Arc::new(MemoryTicketStore::new()),
                    Arc::new(SqliteAuditStore::in_memory().context("Failed to create audit store")?),
                )
            }
        };
    info!("Ticket and audit stores initialized");

    // The bot cannot work without a valid token, so verify it before serving
    let bot_api: Arc<dyn BotApi> = Arc::new(
        TelegramClient::new(&config.telegram).context("Failed to create Bot API client")?,
    );
    let me = bot_api
        .get_me()
        .await
        .context("Bot API rejected the configured token")?;
    let bot_username = me.username.clone();
    info!(
        "Connected to Bot API as {}",
        bot_username.as_deref().unwrap_or(&me.first_name)
    );

    let (audit_handle, audit_writer) =
        create_audit_system(Arc::clone(&audit_store), AUDIT_BUFFER_SIZE);
    let writer_handle = tokio::spawn(audit_writer.run());

    audit_handle
        .emit(AuditEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
            bot_username,
        })
        .await;
    info!("Emitted ServiceStarted audit event");

    let forwarder: Arc<dyn TicketForwarder> = match config.telegram.admin_chat_id {
        Some(chat_id) => {
            info!("Forwarding tickets to admin chat {}", chat_id);
            Arc::new(TelegramForwarder::new(Arc::clone(&bot_api), chat_id))
        }
        None => {
            warn!("telegram.admin_chat_id not set, tickets will not be forwarded");
            Arc::new(NoopForwarder)
        }
    };

    let tracker = match config.conversation.pending_ttl_secs {
        0 => ConversationTracker::new(),
        secs => {
            let ttl = i64::try_from(secs)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .context("conversation.pending_ttl_secs is out of range")?;
            ConversationTracker::with_ttl(ttl)
        }
    };

    let desk = Arc::new(
        SupportDesk::new(ticket_store, tracker, forwarder).with_audit(audit_handle.clone()),
    );

    let dispatcher = Arc::new(BotDispatcher::new(
        Arc::clone(&bot_api),
        Arc::clone(&desk),
        config.telegram.admin_chat_id,
    ));
    let poller = BotPoller::new(
        Arc::clone(&bot_api),
        dispatcher,
        PollerConfig::from(&config.telegram),
    );
    poller.start().await;

    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        audit_handle.clone(),
        audit_store,
        desk,
    ));

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    poller.stop().await;

    info!("Server shutting down...");
    audit_handle
        .emit(AuditEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // The writer exits once every AuditHandle clone is gone. The desk holds
    // one through the poller's dispatcher.
    drop(poller);
    drop(audit_handle);

    if let Err(e) = writer_handle.await {
        warn!("Audit writer task failed: {}", e);
    }
    info!("Audit writer stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
