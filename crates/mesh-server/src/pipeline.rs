//! Per-request serving decisions.
//!
//! [`RequestPipeline::handle`] runs every request through the same states:
//!
//! ```text
//! resolve path -> system path? ---------------------------> 403
//!              -> directory and listings denied?
//!                   welcome file -------------------------> 302
//!                   none ---------------------------------> 403
//!              -> missing and moved? ---------------------> 301
//!              -> site root and language roots? ----------> 302
//!              -> look up page record (count guest hit)
//!              -> cache lookup (guest GET, no query, indexed visual page)
//!                   hit  -> send, gunzipping if the client refuses gzip;
//!                           a tiny or corrupt entry is dropped as a miss
//!                   miss -> render through a gzip tee, commit unless
//!                           the render forbids caching
//!              -> render error -> welcome redirect, 404 or generic 500
//! ```
//!
//! Each request works against one index snapshot taken at the start. After
//! answering, the pipeline gives the site a chance to start a background
//! rebuild, and starts a cache janitor alongside it.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use mesh_cache::gzip::{self, GzipTee};
use mesh_cache::{CacheScope, Janitor, ResponseCache};
use mesh_path::Path;
use mesh_site::{Language, Site, SiteIndex};

use crate::render::{RenderError, RenderOutcome, Renderer};
use crate::response::{CacheStatus, Page, PageResponse};

/// Cached payloads this size or smaller are dropped and rendered again.
const MIN_CACHED_PAYLOAD: usize = 256;

/// Everything the pipeline needs to know about one request.
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// HTTP method.
    pub method: Method,
    /// Percent-decoded request path.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// `Accept-Encoding` header value.
    pub accept_encoding: Option<String>,
    /// `Accept-Language` header value.
    pub accept_language: Option<String>,
    /// The visitor is anonymous.
    pub guest: bool,
}

impl PageRequest {
    /// Anonymous `GET` request for `path` without extra headers.
    #[must_use]
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            path: path.to_owned(),
            query: None,
            accept_encoding: None,
            accept_language: None,
            guest: true,
        }
    }
}

/// Where and when to purge old cache files.
#[derive(Debug, Clone)]
pub struct JanitorSettings {
    /// Cache root.
    pub dir: PathBuf,
    /// Files older than this are removed.
    pub max_age: Duration,
}

/// Request handling policy.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Answer directory requests with a redirect to their welcome file, or
    /// deny them when there is none. Otherwise directories go to the
    /// renderer like any other path.
    pub deny_directory_listings: bool,
    /// Redirect requests for missing pages to the closest indexed page.
    pub search_moved_pages: bool,
    /// Include render failure details in error responses.
    pub show_errors: bool,
    /// Send guests asking for the site root to their preferred language.
    pub redirect_root: bool,
    /// Extensions (without dot) of pages whose output may be cached.
    pub visual_extensions: Vec<String>,
    /// Cache janitor started with each background rebuild.
    pub janitor: Option<JanitorSettings>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            deny_directory_listings: true,
            search_moved_pages: true,
            show_errors: false,
            redirect_root: false,
            visual_extensions: vec!["html".to_owned(), "htm".to_owned()],
            janitor: None,
        }
    }
}

/// Serves site requests from the index, the response cache and a renderer.
pub struct RequestPipeline {
    site: Arc<Site>,
    cache: Arc<dyn ResponseCache>,
    renderer: Arc<dyn Renderer>,
    options: PipelineOptions,
}

impl RequestPipeline {
    /// Create a pipeline.
    #[must_use]
    pub fn new(
        site: Arc<Site>,
        cache: Arc<dyn ResponseCache>,
        renderer: Arc<dyn Renderer>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            site,
            cache,
            renderer,
            options,
        }
    }

    /// Site served by this pipeline.
    #[must_use]
    pub fn site(&self) -> &Arc<Site> {
        &self.site
    }

    /// Answer one request, then schedule index maintenance.
    pub fn handle(&self, request: &PageRequest) -> PageResponse {
        let index = self.site.index();
        let response = self.respond(&index, request);
        self.maintain();
        response
    }

    fn respond(&self, index: &SiteIndex, request: &PageRequest) -> PageResponse {
        let path = Path::new(request.path.as_str());
        let settings = self.site.settings();
        let source = self.site.source();
        let query = request.query.as_deref();

        if settings.is_system(&path) {
            tracing::debug!(path = %path, "Denied system path");
            return PageResponse::Forbidden;
        }

        if self.options.deny_directory_listings
            && source.stat(&path).is_some_and(|stat| stat.is_dir())
        {
            return match self.welcome_of(index, &path) {
                Some(welcome) => PageResponse::redirect(&welcome, query, false),
                None => PageResponse::Forbidden,
            };
        }

        if self.options.search_moved_pages
            && !source.exists(&path)
            && let Some(target) = index.redirect_match(&path)
        {
            tracing::debug!(from = %path, to = %target, "Redirecting moved page");
            return PageResponse::redirect(&target, None, true);
        }

        if self.options.redirect_root
            && request.guest
            && index.path_in_menu(&path).is_root()
            && let Some(language) =
                preferred_language(index.languages(), request.accept_language.as_deref())
        {
            return PageResponse::redirect(&language.path, query, false);
        }

        let record = index.get(&path);
        if request.guest
            && let Some(record) = record
        {
            record.stats.record_hit();
        }

        let mut page = Page {
            body: Vec::new(),
            gzipped: false,
            content_type: content_type(path.last()),
            last_modified: record.map(|record| record.last_modified),
            cache: CacheStatus::Bypass,
        };

        let cacheable = request.guest
            && record.is_some()
            && request.method == Method::GET
            && query.is_none_or(str::is_empty)
            && self.is_visual(&path);
        if !cacheable {
            return match self.renderer.render(&path, &mut page.body) {
                Ok(_) => PageResponse::Page(page),
                Err(e) => self.recover(index, &path, query, &e),
            };
        }

        let served = index.served_path(&index.path_in_menu(&path));
        let scope = CacheScope::new(index.generation(), index.built_at());
        let wants_gzip = gzip::accepts_gzip(request.accept_encoding.as_deref());

        if let Some(cached) = self.cache.get(&served, &scope) {
            match cached_body(&cached, wants_gzip) {
                Ok(body) => {
                    page.body = body;
                    page.gzipped = wants_gzip;
                    page.cache = CacheStatus::Hit;
                    return PageResponse::Page(page);
                }
                Err(reason) => {
                    tracing::warn!(path = %served, reason = %reason, "Dropping unusable cache entry");
                    self.cache.remove(&served);
                }
            }
        }

        page.cache = CacheStatus::Miss;
        match self.render_captured(&path, &mut page.body) {
            Ok((outcome, gzipped)) => {
                if outcome.do_not_cache {
                    tracing::debug!(path = %served, "Render asked not to be cached");
                } else {
                    self.cache.put(&served, &scope, &gzipped);
                }
                PageResponse::Page(page)
            }
            Err(e) => self.recover(index, &path, query, &e),
        }
    }

    /// Render into `body` while building a gzip copy for the cache.
    fn render_captured(
        &self,
        path: &Path,
        body: &mut Vec<u8>,
    ) -> Result<(RenderOutcome, Vec<u8>), RenderError> {
        let mut tee = GzipTee::new(body);
        let outcome = self.renderer.render(path, &mut tee)?;
        let (_, gzipped) = tee.finish()?;
        Ok((outcome, gzipped))
    }

    /// Turn a render failure into the best remaining answer.
    fn recover(
        &self,
        index: &SiteIndex,
        path: &Path,
        query: Option<&str>,
        error: &RenderError,
    ) -> PageResponse {
        if let Some(welcome) = self.welcome_of(index, path)
            && welcome != *path
        {
            return PageResponse::redirect(&welcome, query, false);
        }
        if let RenderError::NotFound(_) = error {
            return PageResponse::NotFound;
        }
        tracing::error!(path = %path, error = %error, "Render failed");
        PageResponse::Error {
            detail: self.options.show_errors.then(|| error.to_string()),
        }
    }

    /// Welcome file of a directory, from the index or the content source.
    fn welcome_of(&self, index: &SiteIndex, dir: &Path) -> Option<Path> {
        if let Some(welcome) = index.current_welcome(dir) {
            return Some(welcome.clone());
        }
        let source = self.site.source();
        if !source.stat(dir).is_some_and(|stat| stat.is_dir()) {
            return None;
        }
        self.site
            .settings()
            .welcome_files
            .iter()
            .map(|name| dir.add(name.as_str()))
            .find(|candidate| source.stat(candidate).is_some_and(|stat| stat.is_file()))
    }

    fn is_visual(&self, path: &Path) -> bool {
        let name = path.last();
        name.rsplit_once('.').is_some_and(|(stem, ext)| {
            !stem.is_empty()
                && self
                    .options
                    .visual_extensions
                    .iter()
                    .any(|visual| visual.eq_ignore_ascii_case(ext))
        })
    }

    /// Start a background rebuild when the index is stale, with a janitor.
    fn maintain(&self) {
        if self.site.refresh_if_stale().is_none() {
            return;
        }
        if let Some(janitor) = &self.options.janitor
            && let Err(e) = Janitor::new(janitor.dir.clone(), janitor.max_age).spawn()
        {
            tracing::warn!(error = %e, "Failed to start cache janitor");
        }
    }
}

/// Body to send for a cached payload, or why the entry can't be used.
///
/// Payloads no larger than [`MIN_CACHED_PAYLOAD`] come from truncated or
/// empty renders and are never served.
fn cached_body(cached: &[u8], wants_gzip: bool) -> Result<Vec<u8>, String> {
    if cached.len() <= MIN_CACHED_PAYLOAD {
        return Err(format!("only {} bytes", cached.len()));
    }
    if !wants_gzip {
        return gzip::decompress(cached).map_err(|e| e.to_string());
    }
    if gzip::has_header(cached) {
        Ok(cached.to_vec())
    } else {
        Err("missing gzip header".to_owned())
    }
}

/// `Content-Type` for a file name; HTML when the type is unknown.
fn content_type(name: &str) -> String {
    match mime_guess::from_path(name).first() {
        Some(mime) if mime.type_() == mime_guess::mime::TEXT => format!("{mime}; charset=utf-8"),
        Some(mime) => mime.to_string(),
        None => "text/html; charset=utf-8".to_owned(),
    }
}

/// First language matching the `Accept-Language` preferences, or the first
/// language of the site.
fn preferred_language<'a>(
    languages: &'a [Language],
    accept_language: Option<&str>,
) -> Option<&'a Language> {
    let accepted = accept_language
        .unwrap_or_default()
        .split(',')
        .filter_map(|item| item.split(';').next())
        .map(|tag| tag.trim().replace('-', "_"))
        .filter(|tag| !tag.is_empty() && tag != "*");
    for tag in accepted {
        let primary = tag.split('_').next().unwrap_or_default();
        let found = languages
            .iter()
            .find(|language| language.code.eq_ignore_ascii_case(&tag))
            .or_else(|| {
                languages
                    .iter()
                    .find(|language| language.language.eq_ignore_ascii_case(primary))
            });
        if found.is_some() {
            return found;
        }
    }
    languages.first()
}
