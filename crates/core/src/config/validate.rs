use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde)
/// - api_key is set when auth method is api_key
/// - Server port is not 0
/// - Telegram bot token is set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().is_none_or(str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
        ));
    }

    if config.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "telegram.bot_token must be set".to_string(),
        ));
    }

    if config.telegram.poll_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "telegram.poll_timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
