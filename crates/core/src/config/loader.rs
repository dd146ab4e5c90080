use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variable prefix for overrides, e.g. `HELPDESK_TELEGRAM__BOT_TOKEN`.
pub const ENV_PREFIX: &str = "HELPDESK_";

/// Read `path` and apply `HELPDESK_*` overrides on top. Nested keys use a
/// double underscore: `HELPDESK_CONVERSATION__PENDING_TTL_SECS=600`.
///
/// The bot token is usually supplied this way so it stays out of the file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::from(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Parse a TOML document without environment overrides.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
