//! Authentication and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use helpdesk_core::{AuthError, AuthRequest, Identity};

use crate::metrics::{
    normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Records duration, count and in-flight gauge for every request.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Rejects requests the configured authenticator does not accept with 401.
/// On success the caller's [`Identity`] is stored in the request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let authenticator = state.authenticator();
    let mut request = request;

    if authenticator.method_name() == "none" {
        request.extensions_mut().insert(Identity::anonymous());
        return Ok(next.run(request).await);
    }

    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    match authenticator.authenticate(&AuthRequest { headers }).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(e) => {
            let (reason, status) = match e {
                AuthError::NotAuthenticated => ("not_authenticated", StatusCode::UNAUTHORIZED),
                AuthError::InvalidCredentials(_) => {
                    ("invalid_credentials", StatusCode::UNAUTHORIZED)
                }
                AuthError::ConfigurationError(_) => {
                    ("internal_error", StatusCode::INTERNAL_SERVER_ERROR)
                }
            };
            AUTH_FAILURES_TOTAL.with_label_values(&[reason]).inc();
            tracing::debug!(reason, "Rejected API request");
            Err(status)
        }
    }
}

/// The authenticated caller's user id, "anonymous" outside the auth layer.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let user_id = parts
            .extensions
            .get::<Identity>()
            .map(|id| id.user_id.clone())
            .unwrap_or_else(|| "anonymous".to_string());
        std::future::ready(Ok(AuthUser(user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request},
        middleware,
        routing::get,
        Router,
    };
    use helpdesk_core::testing::MockForwarder;
    use helpdesk_core::{
        create_audit_system, create_authenticator, AuditStore, AuthConfig, AuthMethod,
        Authenticator, Config, ConversationTracker, MemoryTicketStore, SqliteAuditStore,
        SupportDesk, TelegramConfig, TicketStore,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn dummy_handler() -> &'static str {
        "OK"
    }

    async fn user_handler(AuthUser(user_id): AuthUser) -> String {
        user_id
    }

    fn create_test_state(auth: AuthConfig) -> Arc<AppState> {
        let config = Config {
            auth: auth.clone(),
            server: Default::default(),
            database: Default::default(),
            telegram: TelegramConfig {
                bot_token: "123:abc".to_string(),
                ..Default::default()
            },
            conversation: Default::default(),
        };

        let authenticator: Arc<dyn Authenticator> =
            Arc::from(create_authenticator(&auth).unwrap());
        let audit_store: Arc<dyn AuditStore> = Arc::new(SqliteAuditStore::in_memory().unwrap());
        let (audit, _writer) = create_audit_system(audit_store.clone(), 100);
        let store: Arc<dyn TicketStore> = Arc::new(MemoryTicketStore::new());
        let desk = SupportDesk::new(
            store,
            ConversationTracker::new(),
            Arc::new(MockForwarder::new()),
        );

        Arc::new(AppState::new(
            config,
            authenticator,
            audit,
            audit_store,
            Arc::new(desk),
        ))
    }

    fn api_key_state() -> Arc<AppState> {
        create_test_state(AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: Some("secret-key".to_string()),
        })
    }

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/test", get(dummy_handler))
            .route("/whoami", get(user_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    async fn send(state: Arc<AppState>, request: Request<Body>) -> (StatusCode, String) {
        let response = app(state).oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_none_auth_allows_all() {
        let state = create_test_state(AuthConfig {
            method: AuthMethod::None,
            api_key: None,
        });

        let request = Request::builder().uri("/whoami").body(Body::empty()).unwrap();
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn test_api_key_bearer_accepted() {
        let request = Request::builder()
            .uri("/whoami")
            .header(header::AUTHORIZATION, "Bearer secret-key")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(api_key_state(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin");
    }

    #[tokio::test]
    async fn test_x_api_key_header_accepted() {
        let request = Request::builder()
            .uri("/test")
            .header("X-API-Key", "secret-key")
            .body(Body::empty())
            .unwrap();

        let (status, _) = send(api_key_state(), request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_key_rejected() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer wrong-key")
            .body(Body::empty())
            .unwrap();

        let (status, _) = send(api_key_state(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_key_rejected() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let (status, _) = send(api_key_state(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_user_without_layer_is_anonymous() {
        let app = Router::new().route("/whoami", get(user_handler));
        let response = app
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"anonymous");
    }
}
