//! Visitor identification.

use axum::http::HeaderMap;

/// Decides whether a request comes from an anonymous visitor.
///
/// Only anonymous visitors count as page hits and share cached responses.
pub trait Identity: Send + Sync {
    /// True when the request carries no authenticated identity.
    fn is_guest(&self, headers: &HeaderMap) -> bool;
}

/// [`Identity`] for sites without accounts: every visitor is a guest.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnonymousOnly;

impl Identity for AnonymousOnly {
    fn is_guest(&self, _headers: &HeaderMap) -> bool {
        true
    }
}
