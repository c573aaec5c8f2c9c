//! HTTP server and request pipeline for Mesh.
//!
//! This crate serves a site out of a content directory:
//! - [`RequestPipeline`] decides per request between denying, redirecting,
//!   answering from the response cache and rendering
//! - [`Renderer`] produces page bodies ([`FileRenderer`] sends files as is)
//! - [`Identity`] tells anonymous visitors from authenticated ones
//!
//! # Quick Start
//!
//! ```ignore
//! use mesh_server::{run_server, server_config_from_config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = mesh_config::Config::load(None, None).unwrap();
//!     let server_config = server_config_from_config(&config, "1.0.0".to_owned());
//!
//!     run_server(server_config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum router (mesh-server)
//!                        │
//!                        └─► spawn_blocking ──► RequestPipeline
//!                                                  │
//!                                                  ├─► SiteIndex snapshot (mesh-site)
//!                                                  ├─► ResponseCache (mesh-cache)
//!                                                  └─► Renderer
//! ```

mod app;
mod error;
mod identity;
mod middleware;
mod pipeline;
mod render;
mod response;
mod state;

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use mesh_cache::{DiskCache, HybridCache, MemoryCache, NullCache, ResponseCache};
use mesh_config::CacheMode;
use mesh_path::Path;
use mesh_site::{PageScores, Site, SiteSettings};
use mesh_storage::{ContentSource, FsSource};
use state::AppState;

pub use error::ServerError;
pub use identity::{AnonymousOnly, Identity};
pub use pipeline::{JanitorSettings, PageRequest, PipelineOptions, RequestPipeline};
pub use render::{FileRenderer, RenderError, RenderOutcome, Renderer};
pub use response::{CacheStatus, Page, PageResponse};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Site content directory.
    pub source_dir: PathBuf,
    /// Response cache directory (disk and hybrid modes).
    pub cache_dir: PathBuf,
    /// Response cache mode.
    pub cache_mode: CacheMode,
    /// Memory entries kept in front of the disk cache in hybrid mode.
    pub hybrid_capacity: NonZeroUsize,
    /// Age after which the janitor deletes cache files.
    pub janitor_max_age: Duration,
    /// Indexing settings.
    pub site: SiteSettings,
    /// Explicit ranking scores by site path.
    pub scores: Vec<(Path, i32)>,
    /// Request handling policy.
    pub pipeline: PipelineOptions,
    /// Application version.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            source_dir: PathBuf::from("site"),
            cache_dir: PathBuf::from(".mesh/cache"),
            cache_mode: CacheMode::None,
            hybrid_capacity: NonZeroUsize::new(256).unwrap_or(NonZeroUsize::MIN),
            janitor_max_age: Duration::from_secs(7 * 24 * 3600),
            site: SiteSettings::default(),
            scores: Vec::new(),
            pipeline: PipelineOptions::default(),
            version: String::new(),
        }
    }
}

/// Create the response cache for a cache mode.
#[must_use]
pub fn build_cache(
    mode: CacheMode,
    dir: &std::path::Path,
    hybrid_capacity: NonZeroUsize,
) -> Arc<dyn ResponseCache> {
    match mode {
        CacheMode::None => Arc::new(NullCache),
        CacheMode::Memory => Arc::new(MemoryCache::new()),
        CacheMode::Disk => Arc::new(DiskCache::new(dir.to_path_buf())),
        CacheMode::Hybrid => Arc::new(HybridCache::new(dir.to_path_buf(), hybrid_capacity)),
    }
}

/// Run the server.
///
/// Crawls the site once before accepting connections.
///
/// # Errors
///
/// Returns an error if the address is invalid or the server fails to start.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let source: Arc<dyn ContentSource> = Arc::new(FsSource::new(config.source_dir.clone()));
    let scores: PageScores = config.scores.iter().cloned().collect();
    let site = Arc::new(
        Site::new(Arc::clone(&source), config.site.clone()).with_site_info(Arc::new(scores)),
    );

    let index = {
        let site = Arc::clone(&site);
        tokio::task::spawn_blocking(move || site.rebuild_now()).await?
    };
    tracing::info!(
        pages = index.len(),
        languages = index.languages().len(),
        source_dir = %config.source_dir.display(),
        "Site indexed"
    );

    let cache = build_cache(config.cache_mode, &config.cache_dir, config.hybrid_capacity);
    let mut options = config.pipeline.clone();
    if matches!(config.cache_mode, CacheMode::Disk | CacheMode::Hybrid) {
        options.janitor = Some(JanitorSettings {
            dir: config.cache_dir.clone(),
            max_age: config.janitor_max_age,
        });
    }
    let pipeline = RequestPipeline::new(site, cache, Arc::new(FileRenderer::new(source)), options);

    let state = Arc::new(AppState {
        pipeline: Arc::new(pipeline),
        identity: Arc::new(AnonymousOnly),
        version: config.version.clone(),
    });
    let app = app::create_router(state);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(
        address = %addr,
        version = %config.version,
        cache = ?config.cache_mode,
        "Starting server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Indexing settings from Mesh config.
#[must_use]
pub fn site_settings_from_config(config: &mesh_config::Config) -> SiteSettings {
    SiteSettings {
        welcome_files: config.site.welcome_files.clone(),
        page_extensions: config.site.page_extensions.clone(),
        excerpt_length: config.site.excerpt_length,
        retention_days: usize::try_from(config.index.retention_days).unwrap_or(usize::MAX),
        rebuild_interval: Duration::from_millis(config.index.rebuild_interval_ms),
        system_dirs: config.site.system_dirs.clone(),
    }
}

/// Ranking scores from Mesh config.
#[must_use]
pub fn scores_from_config(config: &mesh_config::Config) -> Vec<(Path, i32)> {
    config
        .scores
        .iter()
        .map(|(path, score)| (Path::new(path.as_str()), *score))
        .collect()
}

/// Create server configuration from Mesh config.
#[must_use]
pub fn server_config_from_config(config: &mesh_config::Config, version: String) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        source_dir: config.paths.source_dir.clone(),
        cache_dir: config.paths.cache_dir.clone(),
        cache_mode: config.cache.mode,
        hybrid_capacity: NonZeroUsize::new(config.cache.hybrid_capacity)
            .unwrap_or(NonZeroUsize::MIN),
        janitor_max_age: Duration::from_secs(config.cache.janitor_max_age_hours.saturating_mul(3600)),
        site: site_settings_from_config(config),
        scores: scores_from_config(config),
        pipeline: PipelineOptions {
            deny_directory_listings: config.requests.deny_directory_listings,
            search_moved_pages: config.requests.search_moved_pages,
            show_errors: config.requests.show_errors,
            redirect_root: config.requests.redirect_root,
            visual_extensions: config.site.visual_extensions.clone(),
            janitor: None,
        },
        version,
    }
}
