//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use crate::identity::Identity;
use crate::pipeline::RequestPipeline;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Serving decisions for site requests.
    pub(crate) pipeline: Arc<RequestPipeline>,
    /// Tells guests from authenticated visitors.
    pub(crate) identity: Arc<dyn Identity>,
    /// Application version, advertised in the `Server` header.
    pub(crate) version: String,
}
