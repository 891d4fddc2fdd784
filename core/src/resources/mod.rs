//! Concrete resource collections built on `Resource`.
//!
//! Each collection only knows its paths and payload types. A collection can
//! be scoped to per-call `Overrides` with `with_overrides`, which returns a
//! copy applying them to every request it sends.

mod auth;
mod calendars;
mod events;
mod webhooks;

pub use auth::Auth;
pub use calendars::Calendars;
pub use events::Events;
pub use webhooks::Webhooks;

use std::borrow::Cow;

/// Percent-encode a value used as one path segment.
fn segment(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}
