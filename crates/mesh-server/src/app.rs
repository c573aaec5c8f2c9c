//! Router construction.
//!
//! Every request goes to the page handler, which hands it to the
//! [`RequestPipeline`](crate::RequestPipeline) on the blocking pool.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::error::ServerError;
use crate::middleware::security;
use crate::pipeline::PageRequest;
use crate::state::AppState;

/// Create the application router.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let server = security::server_layer(&state.version);
    Router::new()
        .fallback(serve_page)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security::content_type_options_layer())
                .layer(security::frame_options_layer())
                .layer(security::referrer_policy_layer())
                .layer(server),
        )
        .with_state(state)
}

/// Handle any site request.
async fn serve_page(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let path = percent_decode_str(uri.path())
        .decode_utf8()
        .map_err(|_| ServerError::InvalidPath(uri.path().to_owned()))?
        .into_owned();
    let header_str = |name| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    let request = PageRequest {
        method,
        path,
        query: uri.query().map(str::to_owned),
        accept_encoding: header_str(header::ACCEPT_ENCODING),
        accept_language: header_str(header::ACCEPT_LANGUAGE),
        guest: state.identity.is_guest(&headers),
    };

    let pipeline = Arc::clone(&state.pipeline);
    let response = tokio::task::spawn_blocking(move || pipeline.handle(&request)).await?;
    Ok(response.into_response())
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use mesh_cache::MemoryCache;
    use mesh_site::{Site, SiteSettings};
    use mesh_storage::{ContentSource, MockSource};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::identity::AnonymousOnly;
    use crate::pipeline::{PipelineOptions, RequestPipeline};
    use crate::render::FileRenderer;

    fn router() -> Router {
        let source: Arc<dyn ContentSource> = Arc::new(
            MockSource::new()
                .with_file("index.html", 100, "<title>Home</title>")
                .with_file("über uns.html", 100, "<title>Über uns</title>"),
        );
        let site = Arc::new(Site::new(Arc::clone(&source), SiteSettings::default()));
        site.rebuild_now();
        let pipeline = RequestPipeline::new(
            site,
            Arc::new(MemoryCache::new()),
            Arc::new(FileRenderer::new(source)),
            PipelineOptions::default(),
        );
        create_router(Arc::new(AppState {
            pipeline: Arc::new(pipeline),
            identity: Arc::new(AnonymousOnly),
            version: "1.2.3".to_owned(),
        }))
    }

    async fn get(uri: &str) -> Response {
        router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_serves_page_with_headers() {
        let response = get("/index.html").await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache, no-store, must-revalidate");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
        assert_eq!(headers[header::SERVER], "mesh/1.2.3");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<title>Home</title>");
    }

    #[tokio::test]
    async fn test_root_redirects_to_welcome_file() {
        let response = get("/").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/index.html");
    }

    #[tokio::test]
    async fn test_percent_encoded_path() {
        let response = get("/%C3%BCber%20uns.html").await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_utf8_path() {
        let response = get("/%FF.html").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_page() {
        let response = get("/nothing-like-it/here.html").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
