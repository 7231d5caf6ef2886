use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::context::Context;
use crate::errors::{RenderError, Result};

/// Transient evaluation scope owned by one page execution. Holds the
/// request context, the page's own directory (relative includes and bare
/// identifier lookups resolve against it) and the capturing output buffer.
pub struct Scope {
    pub context: Arc<Context>,
    pub page_dir: PathBuf,
    buffer: String,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("page_dir", &self.page_dir)
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

impl Scope {
    pub fn new(context: Arc<Context>, page_dir: PathBuf) -> Self {
        Self {
            context,
            page_dir,
            buffer: String::new(),
        }
    }

    /// The captured output primitive: everything printed here becomes page
    /// content.
    pub fn print(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// The pass-through diagnostic primitive. Goes to the host log, never
    /// into the rendered page.
    pub fn debug(&self, message: &str) {
        tracing::debug!(page_dir = %self.page_dir.display(), "{message}");
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

/// Run a page: read its source and capture its textual output into a fresh
/// scope seeded with the request context and the page's directory.
///
/// Pages are plain text interleaved with markers, so "running" one emits its
/// text through the scope's capturing primitive; marker evaluation happens
/// afterwards in the expander. Read failures surface as an execution fault
/// carrying the page path, and the caller decides whether that becomes a
/// server error or an inline placeholder.
pub async fn execute(page_path: &Path, context: Arc<Context>) -> Result<(String, Scope)> {
    let source = tokio::fs::read_to_string(page_path)
        .await
        .map_err(|e| {
            let cause = if e.kind() == std::io::ErrorKind::NotFound {
                RenderError::NotFound(page_path.display().to_string())
            } else {
                RenderError::Io(e)
            };
            RenderError::ExecutionFault {
                page: page_path.to_path_buf(),
                source: Box::new(cause),
            }
        })?;
    let page_dir = page_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let mut scope = Scope::new(context, page_dir);
    scope.print(&source);
    scope.debug("page executed");
    Ok((scope.take_output(), scope))
}
