//! Common test utilities for API testing with mocks.
//!
//! The fixture builds the real router over an in-process support desk whose
//! admin forwarder is a mock, so tests can assert on what would have been
//! sent to the admin chat.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use helpdesk_core::testing::MockForwarder;
use helpdesk_core::{
    create_audit_system, create_authenticator, AuditFilter, AuditStore, AuthConfig, AuthMethod,
    Config, ConversationConfig, ConversationTracker, DatabaseConfig, ServerConfig,
    SqliteAuditStore, SqliteTicketStore, StorageBackend, SupportDesk, TelegramConfig,
    TicketStore,
};
use helpdesk_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use helpdesk_core::testing::fixtures;

pub const API_KEY: &str = "test-api-key";

/// Test fixture wrapping an in-process router.
pub struct TestFixture {
    pub router: Router,
    /// Records tickets forwarded to the admin chat
    pub forwarder: Arc<MockForwarder>,
    pub desk: Arc<SupportDesk>,
    pub audit_store: Arc<dyn AuditStore>,
    /// Sent with every request when set
    pub api_key: Option<String>,
    /// Holds the SQLite file
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Require `API_KEY` on protected routes
    pub require_api_key: bool,
}

impl TestConfig {
    pub fn with_api_key() -> Self {
        Self {
            require_api_key: true,
        }
    }
}

impl TestFixture {
    /// Create a new test fixture without authentication.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let auth = if test_config.require_api_key {
            AuthConfig {
                method: AuthMethod::ApiKey,
                api_key: Some(API_KEY.to_string()),
            }
        } else {
            AuthConfig {
                method: AuthMethod::None,
                api_key: None,
            }
        };

        let config = Config {
            auth: auth.clone(),
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 8080,
            },
            database: DatabaseConfig {
                backend: StorageBackend::Sqlite,
                path: db_path.clone(),
            },
            telegram: TelegramConfig {
                bot_token: "123:secret-token".to_string(),
                admin_chat_id: Some(-100),
                ..Default::default()
            },
            conversation: ConversationConfig::default(),
        };

        let authenticator: Arc<dyn helpdesk_core::Authenticator> = Arc::from(
            create_authenticator(&config.auth).expect("Failed to create authenticator"),
        );
        let audit_store: Arc<dyn AuditStore> =
            Arc::new(SqliteAuditStore::new(&db_path).expect("Failed to create audit store"));
        let ticket_store: Arc<dyn TicketStore> =
            Arc::new(SqliteTicketStore::new(&db_path).expect("Failed to create ticket store"));

        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let forwarder = Arc::new(MockForwarder::new());
        let desk = Arc::new(
            SupportDesk::new(
                ticket_store,
                ConversationTracker::new(),
                Arc::clone(&forwarder) as Arc<dyn helpdesk_core::TicketForwarder>,
            )
            .with_audit(audit_handle.clone()),
        );

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            audit_handle,
            Arc::clone(&audit_store),
            Arc::clone(&desk),
        ));

        Self {
            router: create_router(state),
            forwarder,
            desk,
            audit_store,
            api_key: test_config.require_api_key.then(|| API_KEY.to_string()),
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = self
            .builder("POST", path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a GET request without the fixture's API key.
    pub async fn get_unauthenticated(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Poll the audit store until `expected` events matching `filter` exist.
    pub async fn wait_for_audit(&self, filter: &AuditFilter, expected: i64) -> i64 {
        let mut count = 0;
        for _ in 0..50 {
            count = self.audit_store.count(filter).expect("Failed to count");
            if count >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        count
    }

    fn builder(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(path);
        match self.api_key {
            Some(ref key) => builder.header("Authorization", format!("Bearer {}", key)),
            None => builder,
        }
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = self.builder(method, path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into()))
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
