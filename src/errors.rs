use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy for resolution, execution and expansion.
///
/// Faults raised *inside* marker expansion are recovered locally by the
/// expander (rendered as inline placeholders); only top-level execution
/// faults and dispatch-level resolution failures travel through `Result`.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Path escapes the root, or crosses a hidden/private name.
    #[error("access denied: {0}")]
    ResolutionDenied(String),

    /// No servable file at the resolved location.
    #[error("not found: {0}")]
    NotFound(String),

    /// The page body itself failed to run (unreadable file, bad encoding).
    #[error("error rendering page {}: {source}", page.display())]
    ExecutionFault {
        page: PathBuf,
        #[source]
        source: Box<RenderError>,
    },

    /// A marker expression failed to parse or evaluate.
    #[error("{0}")]
    EvaluationFault(String),

    /// A bare identifier named neither a scope value nor a fragment file.
    #[error("name '{0}' is not defined")]
    UndefinedReference(String),

    /// Recursive inclusion ran past the configured maximum depth.
    #[error("include depth limit ({0}) exceeded")]
    DepthExceeded(usize),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
