//! Render collaborator.

use std::io::{self, Write};
use std::sync::Arc;

use mesh_path::Path;
use mesh_storage::{ContentSource, StorageErrorKind};

/// Flags a render reports back to the pipeline.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderOutcome {
    /// The output is dynamic and must not be cached.
    pub do_not_cache: bool,
}

/// Render failure.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Nothing to render at the path.
    #[error("Page not found: {0}")]
    NotFound(Path),
    /// Writing the output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The renderer gave up.
    #[error("Render failed: {0}")]
    Failed(String),
}

/// Produces the response body for a site path.
pub trait Renderer: Send + Sync {
    /// Write the body for `path` to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NotFound`] when nothing exists at `path`, or
    /// another variant when producing or writing the output fails.
    fn render(&self, path: &Path, out: &mut dyn Write) -> Result<RenderOutcome, RenderError>;
}

/// [`Renderer`] that sends the source file unchanged.
pub struct FileRenderer {
    source: Arc<dyn ContentSource>,
}

impl FileRenderer {
    /// Create a renderer over `source`.
    #[must_use]
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }
}

impl Renderer for FileRenderer {
    fn render(&self, path: &Path, out: &mut dyn Write) -> Result<RenderOutcome, RenderError> {
        let bytes = self.source.read(path).map_err(|e| match e.kind {
            StorageErrorKind::NotFound => RenderError::NotFound(path.clone()),
            _ => RenderError::Failed(e.to_string()),
        })?;
        out.write_all(&bytes)?;
        Ok(RenderOutcome::default())
    }
}
