use serde::de::IgnoredAny;
use serde_json::json;
use url::Url;

use crate::client::ApiClient;
use crate::config::Overrides;
use crate::error::ApiError;
use crate::resource::{ListCall, Resource, ResourceRequest};
use crate::response::ItemResponse;
use crate::types::{CreateWebhookRequest, UpdateWebhookRequest, Webhook, WebhookIpAddresses, WebhookWithSecret};

use super::segment;

const WEBHOOKS_PATH: &str = "/v3/webhooks";

/// Application webhooks: `/v3/webhooks`.
#[derive(Debug, Clone)]
pub struct Webhooks {
    resource: Resource,
    overrides: Overrides,
}

impl Webhooks {
    pub fn new(client: ApiClient) -> Self {
        Self {
            resource: Resource::new(client),
            overrides: Overrides::default(),
        }
    }

    pub fn with_overrides(&self, overrides: Overrides) -> Self {
        Self {
            resource: self.resource.clone(),
            overrides,
        }
    }

    pub fn list(&self) -> ListCall<Webhook> {
        self.resource.list(self.request(WEBHOOKS_PATH.to_string()))
    }

    pub fn create(&self, body: &CreateWebhookRequest) -> Result<ItemResponse<WebhookWithSecret>, ApiError> {
        self.resource.create(self.request(WEBHOOKS_PATH.to_string()), body)
    }

    pub fn update(&self, webhook_id: &str, body: &UpdateWebhookRequest) -> Result<ItemResponse<Webhook>, ApiError> {
        self.resource.update(self.request(item_path(webhook_id)), body)
    }

    pub fn destroy(&self, webhook_id: &str) -> Result<(), ApiError> {
        self.resource
            .destroy::<IgnoredAny>(self.request(item_path(webhook_id)))
            .map(|_| ())
    }

    /// Issue a new signing secret for the webhook.
    pub fn rotate_secret(&self, webhook_id: &str) -> Result<ItemResponse<WebhookWithSecret>, ApiError> {
        let path = format!("{}/rotate-secret", item_path(webhook_id));
        self.resource.update(self.request(path), &json!({}))
    }

    /// Addresses the provider sends webhook notifications from.
    pub fn ip_addresses(&self) -> Result<ItemResponse<WebhookIpAddresses>, ApiError> {
        self.resource
            .find(self.request(format!("{WEBHOOKS_PATH}/ip-addresses")))
    }

    /// Read the `challenge` query parameter from a webhook verification URL.
    pub fn extract_challenge_parameter(url: &str) -> Result<String, ApiError> {
        let url = Url::parse(url)?;
        url.query_pairs()
            .find(|(key, _)| key == "challenge")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| ApiError::InvalidRequest("no challenge parameter in URL".to_string()))
    }

    fn request(&self, path: String) -> ResourceRequest {
        ResourceRequest::new(path).overrides(self.overrides.clone())
    }
}

fn item_path(webhook_id: &str) -> String {
    format!("{WEBHOOKS_PATH}/{}", segment(webhook_id))
}
