//! Client library for the Nylas v3 email, calendar and contacts REST API.
//!
//! # Overview
//! Turns method calls into HTTP requests, converts between the wire's
//! snake_case keys and the library's camelCase keys, follows cursor
//! pagination on list endpoints, and reports provider errors as typed
//! `ApiError` values.
//!
//! # Design
//! - `ApiClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values deterministically; a `Transport` does the actual I/O. The default
//!   transport is a blocking `ureq` agent (feature `ureq`).
//! - `ApiClient` holds only an immutable `ClientConfig` and an `Arc`'d
//!   transport, so it is cheap to clone and safe to share across threads.
//! - `Resource` gives every collection the same `list` / `find` / `create` /
//!   `update` / `update_patch` / `destroy` calling convention; `list`
//!   returns a `ListCall` that is either sent for its first page or iterated
//!   page by page.
//! - The expected response shape is chosen by the caller's type
//!   (`ItemResponse`, `ListResponse`, a raw struct or `()`), never inferred
//!   from the payload.

pub mod casing;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod nylas;
pub mod request;
pub mod resource;
pub mod resources;
pub mod response;
pub mod types;

pub use client::ApiClient;
pub use config::{ClientConfig, ConfigError, Overrides};
pub use error::{ApiError, ProviderError};
#[cfg(feature = "ureq")]
pub use http::UreqTransport;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use nylas::Nylas;
pub use request::RequestDescriptor;
pub use resource::{FirstPage, ListCall, Pages, Resource, ResourceRequest};
pub use response::{DeleteResponse, ItemResponse, ListResponse};
