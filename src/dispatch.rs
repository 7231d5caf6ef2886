use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;

use crate::catalog;
use crate::config::ServerConfig;
use crate::context::Context;
use crate::expand;
use crate::resolve::Resolver;

/// What a request resolves to. The HTTP layer maps these onto status codes
/// and transfer mechanics; the core only decides.
#[derive(Debug)]
pub enum Outcome {
    /// Fully expanded page text, ready to send as HTML.
    Page(String),
    /// A static file to stream as-is.
    File(PathBuf),
    /// Generated HTML directory listing.
    Listing(String),
    NotFound(String),
    Denied(String),
    /// Top-level page execution failed for this request only.
    ServerError(String),
}

/// Thin facade over the core: URL in, outcome out. One call = one request;
/// each call builds a fresh context, so requests share no mutable state.
pub struct Dispatcher {
    root: PathBuf,
    config: ServerConfig,
    resolver: Resolver,
}

impl Dispatcher {
    pub fn new(root: impl Into<PathBuf>, config: ServerConfig) -> Self {
        let root = root.into();
        let resolver = Resolver::new(&root, &config);
        Self {
            root,
            config,
            resolver,
        }
    }

    pub async fn dispatch(&self, url_path: &str) -> Outcome {
        let route_name = url_path
            .split('?')
            .next()
            .unwrap_or("")
            .trim_matches('/')
            .to_string();

        if route_name.is_empty() {
            return self.dispatch_index_route().await;
        }

        let path = match self.resolver.url_to_path(&route_name) {
            Ok(path) => path,
            Err(e) => return Outcome::Denied(e.to_string()),
        };
        if !path.exists() {
            // No static file there; fall back to dynamic page resolution.
            return match catalog::find_route(&self.root, &self.config, &route_name) {
                Some(page) => self.render(&page).await,
                None => Outcome::NotFound("File not found".to_string()),
            };
        }
        if path.is_dir() {
            return self.dispatch_directory(&path).await;
        }
        self.dispatch_file(&path).await
    }

    /// Empty URL: first dynamic index route that exists wins.
    async fn dispatch_index_route(&self) -> Outcome {
        for name in &self.config.index_routes {
            if let Some(page) = catalog::find_route(&self.root, &self.config, name) {
                return self.render(&page).await;
            }
        }
        Outcome::NotFound("Home page not found.".to_string())
    }

    /// Directory request: dynamic index pages first, then static index
    /// files, else a generated listing.
    async fn dispatch_directory(&self, dir: &Path) -> Outcome {
        for name in &self.config.index_routes {
            let candidate = dir.join(self.config.page_file_name(name));
            if candidate.is_file() && self.resolver.check_allowed(&candidate).is_ok() {
                return self.render(&candidate).await;
            }
        }
        for name in &self.config.index_files {
            let candidate = dir.join(name);
            if candidate.is_file() && self.resolver.check_allowed(&candidate).is_ok() {
                return Outcome::File(candidate);
            }
        }
        match self.directory_listing(dir) {
            Ok(listing) => Outcome::Listing(listing),
            Err(e) => Outcome::ServerError(e.to_string()),
        }
    }

    async fn dispatch_file(&self, path: &Path) -> Outcome {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if extension == self.config.page_extension {
            // Scripts are only servable under the page naming convention.
            let is_page = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&self.config.page_prefix))
                .unwrap_or(false);
            if !is_page {
                return Outcome::Denied("Access Denied".to_string());
            }
            return self.render(path).await;
        }
        Outcome::File(path.to_path_buf())
    }

    async fn render(&self, page: &Path) -> Outcome {
        let context = Arc::new(Context::for_request(self.root.clone(), &self.config));
        match expand::render_page(&self.root, page, context, &self.config).await {
            Ok(text) => Outcome::Page(text),
            Err(e) => Outcome::ServerError(format!("Error rendering page: {e}")),
        }
    }

    fn directory_listing(&self, dir: &Path) -> std::io::Result<String> {
        let rel = dir
            .strip_prefix(&self.root)
            .unwrap_or(Path::new(""))
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .join("/");
        let mut html = format!(
            "<html><head><title>Index of /{rel}</title></head><body><h1>Index of /{rel}</h1><ul>"
        );
        if !rel.is_empty() {
            let parent = rel.rsplit_once('/').map(|(p, _)| p).unwrap_or("");
            html.push_str(&format!("<li><a href=\"/{parent}\">../</a></li>"));
        }
        let entries = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_str()?.to_string();
                Some((name, e.path()))
            })
            .filter(|(name, _)| !name.starts_with('.') && !name.starts_with('_'))
            .sorted_by(|a, b| a.0.cmp(&b.0));
        for (name, path) in entries {
            let href = if rel.is_empty() {
                name.clone()
            } else {
                format!("{rel}/{name}")
            };
            if path.is_dir() {
                html.push_str(&format!("<li>[DIR] <a href=\"/{href}\">{name}/</a></li>"));
            } else {
                html.push_str(&format!("<li>[FILE] <a href=\"/{href}\">{name}</a></li>"));
            }
        }
        html.push_str("</ul></body></html>");
        Ok(html)
    }
}
