//! Pipeline results and their HTTP form.

use std::time::SystemTime;

use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use mesh_path::Path;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left as is in a path segment of a `Location` header.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// How the response cache took part in a page response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the cache.
    Hit,
    /// Rendered, and eligible for caching.
    Miss,
    /// Rendered, and not eligible for caching.
    Bypass,
}

/// A successfully produced page body.
#[derive(Debug)]
pub struct Page {
    /// Response body, gzip-compressed when `gzipped` is set.
    pub body: Vec<u8>,
    /// The body is gzip-compressed.
    pub gzipped: bool,
    /// `Content-Type` header value.
    pub content_type: String,
    /// Modification time of the indexed page, if any.
    pub last_modified: Option<SystemTime>,
    /// Cache participation.
    pub cache: CacheStatus,
}

/// Terminal state of the request pipeline.
#[derive(Debug)]
pub enum PageResponse {
    /// Page body.
    Page(Page),
    /// Redirect to another site path.
    Redirect {
        /// `Location` header value.
        location: String,
        /// `301` when set, `302` otherwise.
        permanent: bool,
    },
    /// Access denied.
    Forbidden,
    /// Nothing to serve.
    NotFound,
    /// Unrecoverable render failure.
    Error {
        /// Failure detail, only when errors are shown to visitors.
        detail: Option<String>,
    },
}

impl PageResponse {
    /// Redirect to `path`, keeping the request's query string.
    pub(crate) fn redirect(path: &Path, query: Option<&str>, permanent: bool) -> Self {
        Self::Redirect {
            location: location(path, query),
            permanent,
        }
    }

    /// HTTP status code of this response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Page(_) => StatusCode::OK,
            Self::Redirect {
                permanent: true, ..
            } => StatusCode::MOVED_PERMANENTLY,
            Self::Redirect { .. } => StatusCode::FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Error { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Absolute, percent-encoded link to `path` with an optional query.
fn location(path: &Path, query: Option<&str>) -> String {
    let mut link = String::new();
    for segment in path.segments() {
        link.push('/');
        link.extend(utf8_percent_encode(segment, SEGMENT_ENCODE_SET));
    }
    if link.is_empty() {
        link.push('/');
    }
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        link.push('?');
        link.push_str(query);
    }
    link
}

/// Discourage browsers and proxies from caching the response.
fn block_remote_caching(headers: &mut HeaderMap) {
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
}

fn http_date(time: SystemTime) -> String {
    let time: DateTime<Utc> = time.into();
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

impl IntoResponse for PageResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Page(page) => {
                let mut response = (status, page.body).into_response();
                let headers = response.headers_mut();
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_str(&page.content_type)
                        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
                );
                if page.gzipped {
                    headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
                }
                if page.cache != CacheStatus::Bypass {
                    headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
                }
                if let Some(modified) = page.last_modified
                    && modified > SystemTime::UNIX_EPOCH
                    && let Ok(value) = HeaderValue::from_str(&http_date(modified))
                {
                    headers.insert(header::LAST_MODIFIED, value);
                }
                block_remote_caching(headers);
                response
            }
            Self::Redirect { location, .. } => {
                let mut response = status.into_response();
                let headers = response.headers_mut();
                match HeaderValue::from_str(&location) {
                    Ok(value) => {
                        headers.insert(header::LOCATION, value);
                    }
                    Err(e) => {
                        tracing::warn!(location = %location, error = %e, "Invalid redirect target");
                        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                    }
                }
                block_remote_caching(headers);
                response
            }
            Self::Forbidden => (status, "Forbidden").into_response(),
            Self::NotFound => (status, "Not Found").into_response(),
            Self::Error { detail } => (
                status,
                detail.unwrap_or_else(|| "Internal Server Error".to_owned()),
            )
                .into_response(),
        }
    }
}
