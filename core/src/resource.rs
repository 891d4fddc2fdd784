//! Shared base of every resource collection, including cursor pagination.
//!
//! # Design
//! `Resource` wraps an `ApiClient` and exposes one method per HTTP verb so
//! concrete resources only supply paths, query params and bodies.
//!
//! `list` returns a `ListCall`, which can be used two ways:
//! - `send()` fetches the first page and returns a `FirstPage` that can keep
//!   going with `next_page()`;
//! - iterating it yields pages lazily, one request per page, following the
//!   provider's `next_cursor` until a page comes back without one.
//!
//! When the query carries a `limit`, the first fetch keeps requesting
//! follow-up pages (with `limit` reduced to what is still missing) until
//! `limit` items have been gathered or the cursor runs out. The result is
//! capped at exactly `limit` items and is the only page: a limited call never
//! asks for more than `limit` items in total. Its `next_cursor` is left as the
//! provider reported it, so callers can resume explicitly with `pageToken`.
//!
//! Pages are fetched strictly in sequence; dropping the iterator stops
//! further requests. A failed fetch ends the iteration and discards any
//! items gathered for that page.

use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::ApiClient;
use crate::config::Overrides;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::request::{query_map, RequestDescriptor};
use crate::response::ListResponse;

pub const LIMIT_PARAM: &str = "limit";
pub const PAGE_TOKEN_PARAM: &str = "pageToken";

/// Path, query and overrides of a resource call; everything but the method
/// and body.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRequest {
    pub path: String,
    pub query_params: Map<String, Value>,
    pub overrides: Overrides,
}

impl ResourceRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query_params: Map::new(),
            overrides: Overrides::default(),
        }
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// Merge the fields of a serializable struct into the query params.
    pub fn query<Q: Serialize>(mut self, query: &Q) -> Result<Self, ApiError> {
        self.query_params.extend(query_map(query)?);
        Ok(self)
    }

    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    fn descriptor(&self, method: HttpMethod) -> RequestDescriptor {
        RequestDescriptor::new(method, self.path.clone())
            .query_params(self.query_params.clone())
            .overrides(self.overrides.clone())
    }

    /// The requested item count, if any. Zero counts as unset; a float
    /// counts only when it has no fractional part.
    fn limit(&self) -> Option<usize> {
        let limit = match self.query_params.get(LIMIT_PARAM)? {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64)
                    .map(|f| f as u64)
            }),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }?;
        usize::try_from(limit).ok().filter(|&n| n > 0)
    }
}

#[derive(Debug, Clone)]
pub struct Resource {
    client: ApiClient,
}

impl Resource {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn list<T: DeserializeOwned>(&self, request: ResourceRequest) -> ListCall<T> {
        ListCall {
            pages: Pages {
                client: self.client.clone(),
                request,
                cursor: None,
                done: false,
                _marker: PhantomData,
            },
        }
    }

    pub fn find<R: DeserializeOwned>(&self, request: ResourceRequest) -> Result<R, ApiError> {
        self.client.request(&request.descriptor(HttpMethod::Get))
    }

    pub fn create<R, B>(&self, request: ResourceRequest, body: &B) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_payload(HttpMethod::Post, request, body)
    }

    pub fn update<R, B>(&self, request: ResourceRequest, body: &B) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_payload(HttpMethod::Put, request, body)
    }

    pub fn update_patch<R, B>(&self, request: ResourceRequest, body: &B) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_payload(HttpMethod::Patch, request, body)
    }

    pub fn destroy<R: DeserializeOwned>(&self, request: ResourceRequest) -> Result<R, ApiError> {
        self.client.request(&request.descriptor(HttpMethod::Delete))
    }

    fn send_payload<R, B>(&self, method: HttpMethod, request: ResourceRequest, body: &B) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let descriptor = request.descriptor(method).body(body)?;
        self.client.request(&descriptor)
    }
}

/// A pending `list` call. Nothing is sent until it is sent or iterated.
#[derive(Debug)]
pub struct ListCall<T> {
    pages: Pages<T>,
}

impl<T: DeserializeOwned> ListCall<T> {
    /// Fetch the first page.
    pub fn send(self) -> Result<FirstPage<T>, ApiError> {
        let mut rest = self.pages;
        match rest.next() {
            Some(Ok(page)) => Ok(FirstPage { page, rest }),
            Some(Err(err)) => Err(err),
            None => Err(ApiError::InvalidRequest("list produced no pages".to_string())),
        }
    }

    pub fn pages(self) -> Pages<T> {
        self.pages
    }

    /// Drain every page and concatenate the items.
    pub fn collect_all(self) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        for page in self.pages {
            items.extend(page?.data);
        }
        Ok(items)
    }
}

impl<T: DeserializeOwned> IntoIterator for ListCall<T> {
    type Item = Result<ListResponse<T>, ApiError>;
    type IntoIter = Pages<T>;

    fn into_iter(self) -> Pages<T> {
        self.pages
    }
}

/// The first page of a list call plus the means to fetch the following ones.
#[derive(Debug)]
pub struct FirstPage<T> {
    page: ListResponse<T>,
    rest: Pages<T>,
}

impl<T: DeserializeOwned> FirstPage<T> {
    /// Fetch the page after the last one returned; `None` once exhausted.
    pub fn next_page(&mut self) -> Option<Result<ListResponse<T>, ApiError>> {
        self.rest.next()
    }

    pub fn into_inner(self) -> ListResponse<T> {
        self.page
    }

    pub fn into_parts(self) -> (ListResponse<T>, Pages<T>) {
        (self.page, self.rest)
    }
}

impl<T> Deref for FirstPage<T> {
    type Target = ListResponse<T>;

    fn deref(&self) -> &ListResponse<T> {
        &self.page
    }
}

impl<T> DerefMut for FirstPage<T> {
    fn deref_mut(&mut self) -> &mut ListResponse<T> {
        &mut self.page
    }
}

/// Lazy, non-restartable sequence of pages.
#[derive(Debug)]
pub struct Pages<T> {
    client: ApiClient,
    request: ResourceRequest,
    cursor: Option<String>,
    done: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Pages<T> {
    fn fetch(&self) -> Result<ListResponse<T>, ApiError> {
        let mut request = self.request.clone();
        let limit = self.request.limit();
        if let Some(limit) = limit {
            request.query_params.insert(LIMIT_PARAM.to_string(), Value::from(limit));
        }
        if let Some(cursor) = &self.cursor {
            request.query_params.insert(PAGE_TOKEN_PARAM.to_string(), Value::String(cursor.clone()));
        }

        debug!(path = %request.path, cursor = self.cursor.as_deref().unwrap_or("-"), "fetching page");
        let mut page: ListResponse<T> = self.client.request(&request.descriptor(HttpMethod::Get))?;

        let Some(limit) = limit else {
            return Ok(page);
        };

        while page.data.len() < limit {
            let Some(cursor) = page.next_cursor.clone() else {
                break;
            };
            let remaining = limit - page.data.len();
            request.query_params.insert(LIMIT_PARAM.to_string(), Value::from(remaining));
            request.query_params.insert(PAGE_TOKEN_PARAM.to_string(), Value::String(cursor));
            debug!(path = %request.path, gathered = page.data.len(), remaining, "fetching follow-up page");

            let next: ListResponse<T> = self.client.request(&request.descriptor(HttpMethod::Get))?;
            page.data.extend(next.data);
            page.request_id = next.request_id;
            page.next_cursor = next.next_cursor;
        }

        page.data.truncate(limit);
        Ok(page)
    }
}

impl<T: DeserializeOwned> Iterator for Pages<T> {
    type Item = Result<ListResponse<T>, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.fetch() {
            Ok(page) => {
                match &page.next_cursor {
                    Some(cursor) if self.request.limit().is_none() => self.cursor = Some(cursor.clone()),
                    _ => self.done = true,
                }
                Some(Ok(page))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<T: DeserializeOwned> FusedIterator for Pages<T> {}
