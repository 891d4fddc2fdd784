//! Entry point grouping every resource collection over one `ApiClient`.

use crate::client::ApiClient;
use crate::config::{ClientConfig, ConfigError};
use crate::http::Transport;
use crate::resources::{Auth, Calendars, Events, Webhooks};

#[derive(Debug, Clone)]
pub struct Nylas {
    pub auth: Auth,
    pub calendars: Calendars,
    pub events: Events,
    pub webhooks: Webhooks,
    client: ApiClient,
}

impl Nylas {
    /// Validate `config` and build the collections on the default transport.
    #[cfg(feature = "ureq")]
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_client(ApiClient::new(config)))
    }

    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_client(ApiClient::with_transport(config, transport)))
    }

    /// Build from `NYLAS_API_KEY` and friends; see `ClientConfig::from_env`.
    #[cfg(feature = "ureq")]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn from_client(client: ApiClient) -> Self {
        Self {
            auth: Auth::new(client.clone()),
            calendars: Calendars::new(client.clone()),
            events: Events::new(client.clone()),
            webhooks: Webhooks::new(client.clone()),
            client,
        }
    }

    /// The shared client, for endpoints without a dedicated collection.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}
