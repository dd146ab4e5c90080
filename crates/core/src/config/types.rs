use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration for the HTTP API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Required when method = "api_key"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Where tickets are kept
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Embedded SQLite database (durable)
    #[default]
    Sqlite,
    /// Process memory (lost on restart)
    Memory,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// SQLite file, also used by the audit trail
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("helpdesk.db")
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    /// Bot token from BotFather (required)
    #[serde(default)]
    pub bot_token: String,
    /// Chat that receives forwarded tickets. Forwarding is disabled when unset.
    #[serde(default)]
    pub admin_chat_id: Option<i64>,
    /// Bot API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Long-poll timeout passed to getUpdates, in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u32,
    /// HTTP timeout on top of the long-poll timeout, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u32,
    /// Pause after a failed getUpdates call, in milliseconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            admin_chat_id: None,
            api_url: default_api_url(),
            poll_timeout_secs: default_poll_timeout(),
            request_timeout_secs: default_request_timeout(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u32 {
    30
}

fn default_request_timeout() -> u32 {
    10
}

fn default_retry_delay() -> u64 {
    3000
}

/// Conversation tracking configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversationConfig {
    /// How long a ticket waits for the user's message before it is closed
    /// as abandoned, in seconds. 0 = never.
    #[serde(default = "default_pending_ttl")]
    pub pending_ttl_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: default_pending_ttl(),
        }
    }
}

fn default_pending_ttl() -> u64 {
    24 * 60 * 60
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub telegram: SanitizedTelegramConfig,
    pub conversation: ConversationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
}

/// Sanitized Telegram config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTelegramConfig {
    pub bot_token_configured: bool,
    pub admin_chat_id: Option<i64>,
    pub api_url: String,
    pub poll_timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
            },
            server: config.server.clone(),
            database: config.database.clone(),
            telegram: SanitizedTelegramConfig {
                bot_token_configured: !config.telegram.bot_token.is_empty(),
                admin_chat_id: config.telegram.admin_chat_id,
                api_url: config.telegram.api_url.clone(),
                poll_timeout_secs: config.telegram.poll_timeout_secs,
            },
            conversation: config.conversation.clone(),
        }
    }
}
