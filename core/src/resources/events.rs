use crate::client::ApiClient;
use crate::config::Overrides;
use crate::error::ApiError;
use crate::resource::{ListCall, Resource, ResourceRequest};
use crate::response::{DeleteResponse, ItemResponse};
use crate::types::{CreateEventRequest, Event, EventQuery, ListEventsQuery, SendRsvpRequest, UpdateEventRequest};

use super::segment;

/// Events of a grant: `/v3/grants/{grant_id}/events`.
///
/// Every call addresses one calendar through the `calendar_id` query param.
#[derive(Debug, Clone)]
pub struct Events {
    resource: Resource,
    overrides: Overrides,
}

impl Events {
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

    pub fn list(&self, grant_id: &str, query: &ListEventsQuery) -> Result<ListCall<Event>, ApiError> {
        let request = self.request(collection_path(grant_id)).query(query)?;
        Ok(self.resource.list(request))
    }

    pub fn find(&self, grant_id: &str, event_id: &str, query: &EventQuery) -> Result<ItemResponse<Event>, ApiError> {
        self.resource
            .find(self.request(item_path(grant_id, event_id)).query(query)?)
    }

    pub fn create(
        &self,
        grant_id: &str,
        query: &EventQuery,
        body: &CreateEventRequest,
    ) -> Result<ItemResponse<Event>, ApiError> {
        self.resource
            .create(self.request(collection_path(grant_id)).query(query)?, body)
    }

    pub fn update(
        &self,
        grant_id: &str,
        event_id: &str,
        query: &EventQuery,
        body: &UpdateEventRequest,
    ) -> Result<ItemResponse<Event>, ApiError> {
        self.resource
            .update(self.request(item_path(grant_id, event_id)).query(query)?, body)
    }

    pub fn destroy(&self, grant_id: &str, event_id: &str, query: &EventQuery) -> Result<DeleteResponse, ApiError> {
        self.resource
            .destroy(self.request(item_path(grant_id, event_id)).query(query)?)
    }

    /// Answer an invitation as a participant.
    pub fn send_rsvp(
        &self,
        grant_id: &str,
        event_id: &str,
        query: &EventQuery,
        body: &SendRsvpRequest,
    ) -> Result<DeleteResponse, ApiError> {
        let path = format!("{}/send-rsvp", item_path(grant_id, event_id));
        self.resource.create(self.request(path).query(query)?, body)
    }

    fn request(&self, path: String) -> ResourceRequest {
        ResourceRequest::new(path).overrides(self.overrides.clone())
    }
}

fn collection_path(grant_id: &str) -> String {
    format!("/v3/grants/{}/events", segment(grant_id))
}

fn item_path(grant_id: &str, event_id: &str) -> String {
    format!("/v3/grants/{}/events/{}", segment(grant_id), segment(event_id))
}
