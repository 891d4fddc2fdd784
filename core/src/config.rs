//! Client configuration and per-call overrides.
//!
//! # Design
//! Each `ApiClient` owns its `ClientConfig` by value; nothing is global. The
//! config can be built in code, read from the environment, or deserialized as
//! part of a larger application config (timeout given in seconds).

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const DEFAULT_SERVER_URL: &str = "https://api.us.nylas.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_API_KEY: &str = "NYLAS_API_KEY";
pub const ENV_API_URI: &str = "NYLAS_API_URI";
pub const ENV_TIMEOUT: &str = "NYLAS_TIMEOUT";
pub const ENV_CLIENT_ID: &str = "NYLAS_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "NYLAS_CLIENT_SECRET";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("API key must not be empty")]
    EmptyApiKey,

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Standing configuration of an `ApiClient`.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    pub api_key: String,
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_timeout", deserialize_with = "deserialize_secs")]
    pub timeout: Duration,
    /// Application client id, required by the token exchange endpoints.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Application client secret for the token exchange endpoints. When
    /// unset the API key is sent in its place.
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            client_id: None,
            client_secret: None,
        }
    }

    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Read the configuration from `NYLAS_API_KEY` (required),
    /// `NYLAS_API_URI`, `NYLAS_TIMEOUT` (seconds), `NYLAS_CLIENT_ID` and
    /// `NYLAS_CLIENT_SECRET`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup(ENV_API_KEY).ok_or(ConfigError::MissingEnv(ENV_API_KEY))?;
        let mut config = Self::new(api_key);
        if let Some(url) = lookup(ENV_API_URI) {
            config.server_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                name: ENV_TIMEOUT,
                value: raw.clone(),
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        config.client_id = lookup(ENV_CLIENT_ID);
        config.client_secret = lookup(ENV_CLIENT_SECRET);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        if url::Url::parse(&self.server_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "server_url",
                value: self.server_url.clone(),
            });
        }
        Ok(())
    }

    /// Server URL without a trailing slash.
    pub(crate) fn base_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("server_url", &self.server_url)
            .field("timeout", &self.timeout)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Per-call substitutions applied on top of the client's `ClientConfig`.
#[derive(Clone, Default, PartialEq)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub server_url: Option<String>,
    pub timeout: Option<Duration>,
    /// Extra headers; they win over the default headers but lose to headers
    /// set on the request itself.
    pub headers: Vec<(String, String)>,
}

impl Overrides {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = Some(server_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl std::fmt::Debug for Overrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overrides")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("server_url", &self.server_url)
            .field("timeout", &self.timeout)
            .field("headers", &self.headers)
            .finish()
    }
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}
