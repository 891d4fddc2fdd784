use crate::client::ApiClient;
use crate::config::Overrides;
use crate::error::ApiError;
use crate::resource::{ListCall, Resource, ResourceRequest};
use crate::response::{DeleteResponse, ItemResponse};
use crate::types::{
    Availability, Calendar, CreateCalendarRequest, GetAvailabilityRequest, ListCalendarsQuery, UpdateCalendarRequest,
};

use super::segment;

/// Calendars of a grant: `/v3/grants/{grant_id}/calendars`.
#[derive(Debug, Clone)]
pub struct Calendars {
    resource: Resource,
    overrides: Overrides,
}

impl Calendars {
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

    pub fn list(&self, grant_id: &str, query: &ListCalendarsQuery) -> Result<ListCall<Calendar>, ApiError> {
        let request = self.request(collection_path(grant_id)).query(query)?;
        Ok(self.resource.list(request))
    }

    pub fn find(&self, grant_id: &str, calendar_id: &str) -> Result<ItemResponse<Calendar>, ApiError> {
        self.resource.find(self.request(item_path(grant_id, calendar_id)))
    }

    pub fn create(
        &self,
        grant_id: &str,
        body: &CreateCalendarRequest,
    ) -> Result<ItemResponse<Calendar>, ApiError> {
        self.resource.create(self.request(collection_path(grant_id)), body)
    }

    pub fn update(
        &self,
        grant_id: &str,
        calendar_id: &str,
        body: &UpdateCalendarRequest,
    ) -> Result<ItemResponse<Calendar>, ApiError> {
        self.resource.update(self.request(item_path(grant_id, calendar_id)), body)
    }

    pub fn destroy(&self, grant_id: &str, calendar_id: &str) -> Result<DeleteResponse, ApiError> {
        self.resource.destroy(self.request(item_path(grant_id, calendar_id)))
    }

    /// Free slots shared by every participant in the requested window.
    pub fn get_availability(
        &self,
        grant_id: &str,
        body: &GetAvailabilityRequest,
    ) -> Result<ItemResponse<Availability>, ApiError> {
        self.resource.create(self.request(availability_path(grant_id)), body)
    }

    fn request(&self, path: String) -> ResourceRequest {
        ResourceRequest::new(path).overrides(self.overrides.clone())
    }
}

fn collection_path(grant_id: &str) -> String {
    format!("/v3/grants/{}/calendars", segment(grant_id))
}

fn availability_path(grant_id: &str) -> String {
    format!("/v3/grants/{}/calendars/availability", segment(grant_id))
}

fn item_path(grant_id: &str, calendar_id: &str) -> String {
    format!("/v3/grants/{}/calendars/{}", segment(grant_id), segment(calendar_id))
}
