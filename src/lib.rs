pub mod errors;
pub mod config;
pub mod context;
pub mod resolve;
pub mod catalog;
pub mod executor;
pub mod expression;
pub mod expand;
pub mod dispatch;
mod parser;

use std::path::Path;

pub use config::ServerConfig;
pub use context::{Context, Resources};
pub use dispatch::{Dispatcher, Outcome};
pub use errors::{RenderError, Result};
pub use expand::Expander;
pub use resolve::{Base, Resolver};

/// Convenience: dispatch a single URL against a served root with the given
/// configuration. Builds a fresh per-request context internally.
pub async fn serve(root: impl AsRef<Path>, config: &ServerConfig, url_path: &str) -> Outcome {
    Dispatcher::new(root.as_ref(), config.clone())
        .dispatch(url_path)
        .await
}
