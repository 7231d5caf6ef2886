use serde::{Deserialize, Serialize};

/// Server-wide settings observed by the core as a per-request snapshot.
/// Mutation (e.g. an admin renaming the server) happens outside the core;
/// nothing here is touched after a request starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Display name exposed to pages as `context.server_name`.
    pub server_name: String,
    /// Filename prefix a file must carry to be a dynamic page.
    pub page_prefix: String,
    /// Extension (without dot) a dynamic page must carry.
    pub page_extension: String,
    /// Sentinel file marking a directory (and all descendants) private.
    pub private_marker: String,
    /// Route names tried, in order, when a directory or the empty URL is
    /// requested.
    pub index_routes: Vec<String>,
    /// Static filenames tried when no dynamic index exists in a directory.
    pub index_files: Vec<String>,
    /// Hard ceiling on recursive include depth; past it includes fail closed.
    pub max_include_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: "My Server".to_string(),
            page_prefix: "page_".to_string(),
            page_extension: "py".to_string(),
            private_marker: ".private".to_string(),
            index_routes: vec!["home".to_string(), "index".to_string()],
            index_files: vec![
                "index.html".to_string(),
                "index.json".to_string(),
                "index.zip".to_string(),
            ],
            max_include_depth: 16,
        }
    }
}

impl ServerConfig {
    /// `page_about.py` for route name `about`.
    pub fn page_file_name(&self, route: &str) -> String {
        format!("{}{}.{}", self.page_prefix, route, self.page_extension)
    }

    /// True when `file_name` follows the dynamic page naming convention.
    pub fn is_page_file_name(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.page_prefix)
            && file_name.ends_with(&format!(".{}", self.page_extension))
            && file_name.len() > self.page_prefix.len() + self.page_extension.len() + 1
    }

    /// Strip prefix and extension: `page_about.py` -> `about`.
    pub fn route_base_name<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        if !self.is_page_file_name(file_name) {
            return None;
        }
        let stem = &file_name[self.page_prefix.len()..];
        stem.strip_suffix(&format!(".{}", self.page_extension))
    }
}
