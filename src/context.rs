use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use itertools::Itertools;
use serde_json::{json, Map, Value};

use crate::catalog;
use crate::config::ServerConfig;
use crate::errors::Result;
use crate::resolve::{Base, Resolver};

/// Asynchronous capabilities exposed to pages through
/// `context.resources.<method>()`. The surface is enumerated here on purpose:
/// markers can only ever reach what this trait names.
#[async_trait]
pub trait Resources: Send + Sync {
    async fn get_public_ip(&self) -> Result<String>;
    async fn list_routes(&self) -> Result<Vec<String>>;
    async fn list_content(&self, subpath: Option<&str>) -> Result<Vec<String>>;
}

/// Per-request, read-only view handed to every page and fragment rendered
/// for one request. Built once by the dispatcher, dropped at request end.
#[derive(Clone)]
pub struct Context {
    pub server_name: String,
    pub config: Map<String, Value>,
    pub routes: Vec<String>,
    pub resources: Arc<dyn Resources>,
    json_view: Value,
}

impl Context {
    pub fn new(
        server_name: impl Into<String>,
        config: Map<String, Value>,
        routes: Vec<String>,
        resources: Arc<dyn Resources>,
    ) -> Self {
        let server_name = server_name.into();
        let json_view = json!({
            "server_name": server_name,
            "config": Value::Object(config.clone()),
            "routes": routes,
        });
        Self {
            server_name,
            config,
            routes,
            resources,
            json_view,
        }
    }

    /// Build the stock context for a request against `root`: snapshot of the
    /// server config, the current route catalog, filesystem-backed resources.
    pub fn for_request(root: PathBuf, config: &ServerConfig) -> Self {
        let routes: Vec<String> = catalog::discover_routes(&root, config)
            .into_keys()
            .collect();
        let mut config_map = Map::new();
        config_map.insert(
            "server_name".to_string(),
            Value::String(config.server_name.clone()),
        );
        let resources = Arc::new(FsResources {
            root,
            config: config.clone(),
        });
        Self::new(config.server_name.clone(), config_map, routes, resources)
    }

    /// The JSON view marker expressions are resolved against. `resources`
    /// is deliberately absent: calls go through the trait, not the data.
    pub fn json_view(&self) -> &Value {
        &self.json_view
    }
}

/// Stock [`Resources`] backed by the served directory tree.
pub struct FsResources {
    root: PathBuf,
    config: ServerConfig,
}

#[async_trait]
impl Resources for FsResources {
    async fn get_public_ip(&self) -> Result<String> {
        // A deployment would ask an external service; the stock answer
        // matches a local-only server.
        Ok("127.0.0.1".to_string())
    }

    async fn list_routes(&self) -> Result<Vec<String>> {
        Ok(catalog::discover_routes(&self.root, &self.config)
            .into_keys()
            .collect())
    }

    async fn list_content(&self, subpath: Option<&str>) -> Result<Vec<String>> {
        let resolver = Resolver::new(&self.root, &self.config);
        let reference = match subpath {
            Some(sub) => format!("content/{sub}"),
            None => "content".to_string(),
        };
        let dir = resolver.resolve(&reference, Base::Root)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') && !name.starts_with('_') {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names.into_iter().sorted().collect())
    }
}
