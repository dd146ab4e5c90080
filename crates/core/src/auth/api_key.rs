//! Shared-secret authentication for admin and integration callers.

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Identity assigned to callers presenting the configured key.
const API_KEY_USER: &str = "admin";

/// Accepts `Authorization: Bearer <key>` or `X-API-Key: <key>`.
pub struct ApiKeyAuthenticator {
    expected_key: String,
}

impl ApiKeyAuthenticator {
    pub fn new(api_key: String) -> Self {
        Self {
            expected_key: api_key,
        }
    }

    fn extract_key<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        if let Some(value) = request.header("authorization") {
            let (scheme, key) = value.split_once(' ')?;
            return scheme.eq_ignore_ascii_case("bearer").then_some(key.trim());
        }

        request.header("x-api-key")
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided = self
            .extract_key(request)
            .ok_or(AuthError::NotAuthenticated)?;

        if constant_time_eq(provided.as_bytes(), self.expected_key.as_bytes()) {
            Ok(Identity {
                user_id: API_KEY_USER.to_string(),
                method: "api_key".to_string(),
            })
        } else {
            Err(AuthError::InvalidCredentials("Invalid API key".to_string()))
        }
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(name: &str, value: &str) -> AuthRequest {
        let mut request = AuthRequest::default();
        request
            .headers
            .insert(name.to_lowercase(), value.to_string());
        request
    }

    #[tokio::test]
    async fn test_bearer_token_valid() {
        let auth = ApiKeyAuthenticator::new("secret-key-123".to_string());
        let identity = auth
            .authenticate(&request_with("Authorization", "Bearer secret-key-123"))
            .await
            .unwrap();

        assert_eq!(identity.user_id, "admin");
        assert_eq!(identity.method, "api_key");
    }

    #[tokio::test]
    async fn test_bearer_scheme_case_insensitive() {
        let auth = ApiKeyAuthenticator::new("secret-key-123".to_string());
        let result = auth
            .authenticate(&request_with("Authorization", "bearer secret-key-123"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_x_api_key_header_valid() {
        let auth = ApiKeyAuthenticator::new("secret-key-123".to_string());
        let result = auth
            .authenticate(&request_with("X-API-Key", "secret-key-123"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let auth = ApiKeyAuthenticator::new("secret-key-123".to_string());
        let result = auth
            .authenticate(&request_with("Authorization", "Bearer wrong-key"))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_header() {
        let auth = ApiKeyAuthenticator::new("secret-key-123".to_string());
        let result = auth.authenticate(&AuthRequest::default()).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_rejected() {
        let auth = ApiKeyAuthenticator::new("secret-key-123".to_string());
        let result = auth
            .authenticate(&request_with("Authorization", "Basic secret-key-123"))
            .await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }
}
