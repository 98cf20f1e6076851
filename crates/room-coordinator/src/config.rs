//! Room Coordinator configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default listening port for the WebSocket and HTTP surface.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Default media-routing credential lifetime in seconds.
pub const DEFAULT_CREDENTIAL_TTL_SECONDS: u64 = 7200;

/// Credential issuance settings for the alternate media-routing path.
///
/// All three values are required together; rooms that never outgrow the
/// pairwise relay never need them, so the whole block is optional.
#[derive(Clone)]
pub struct MediaConfig {
    /// Endpoint URL handed to clients alongside the credential.
    pub endpoint_url: String,

    /// API key identifying this deployment to the media router.
    pub api_key: String,

    /// Signing secret for issued credentials.
    /// Protected by `SecretString` to prevent accidental logging.
    pub api_secret: SecretString,
}

impl fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// Room Coordinator configuration.
///
/// Loaded from environment variables with sensible defaults.
/// Sensitive fields are redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// Listening port for the combined WebSocket/HTTP server (default: 8080).
    pub listen_port: u16,

    /// Media credential issuance settings; `None` leaves the credential
    /// endpoint reporting a configuration error.
    pub media: Option<MediaConfig>,

    /// Lifetime of issued media credentials in seconds (default: 7200).
    pub credential_ttl_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("listen_port", &self.listen_port)
            .field("media", &self.media)
            .field("credential_ttl_seconds", &self.credential_ttl_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let listen_port = match vars.get("RC_LISTEN_PORT") {
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("RC_LISTEN_PORT must be a port number: {raw}"))
            })?,
            None => DEFAULT_LISTEN_PORT,
        };

        let credential_ttl_seconds = match vars.get("RC_CREDENTIAL_TTL_SECONDS") {
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::InvalidValue(format!(
                    "RC_CREDENTIAL_TTL_SECONDS must be a number of seconds: {raw}"
                ))
            })?,
            None => DEFAULT_CREDENTIAL_TTL_SECONDS,
        };

        // The media credential trio is all-or-nothing; a partial set is almost
        // certainly a deployment mistake, so fail loudly instead of issuing
        // credentials that the media router will reject.
        let endpoint_url = vars.get("RC_MEDIA_ENDPOINT_URL");
        let api_key = vars.get("RC_MEDIA_API_KEY");
        let api_secret = vars.get("RC_MEDIA_API_SECRET");

        let media = match (endpoint_url, api_key, api_secret) {
            (Some(url), Some(key), Some(secret)) => Some(MediaConfig {
                endpoint_url: url.clone(),
                api_key: key.clone(),
                api_secret: SecretString::from(secret.clone()),
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "RC_MEDIA_ENDPOINT_URL, RC_MEDIA_API_KEY and RC_MEDIA_API_SECRET \
                     must be set together"
                        .to_string(),
                ))
            }
        };

        Ok(Config {
            listen_port,
            media,
            credential_ttl_seconds,
        })
    }
}
