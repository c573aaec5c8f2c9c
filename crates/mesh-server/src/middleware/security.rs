//! Security headers middleware.
//!
//! Adds security headers to all responses:
//! - X-Content-Type-Options
//! - X-Frame-Options
//! - Referrer-Policy
//!
//! Also names the server and its version in the `Server` header.

use axum::http::HeaderValue;
use axum::http::header::{self, HeaderName};
use tower_http::set_header::SetResponseHeaderLayer;

/// Create layer that adds X-Content-Type-Options header.
pub(crate) fn content_type_options_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    )
}

/// Create layer that adds X-Frame-Options header.
///
/// Site pages may frame each other, other origins may not.
pub(crate) fn frame_options_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("SAMEORIGIN"),
    )
}

/// Create layer that adds Referrer-Policy header.
pub(crate) fn referrer_policy_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    )
}

/// Create layer that adds a `Server` header naming the version.
pub(crate) fn server_layer(version: &str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(header::SERVER, server_header(version))
}

/// `mesh/{version}`, or plain `mesh` when the version is empty or unusable.
fn server_header(version: &str) -> HeaderValue {
    if version.is_empty() {
        return HeaderValue::from_static("mesh");
    }
    HeaderValue::from_str(&format!("mesh/{version}"))
        .unwrap_or_else(|_| HeaderValue::from_static("mesh"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_server_header() {
        assert_eq!(server_header("1.2.3"), "mesh/1.2.3");
        assert_eq!(server_header(""), "mesh");
        assert_eq!(server_header("bad\nversion"), "mesh");
    }
}
