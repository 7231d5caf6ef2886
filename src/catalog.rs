use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::ServerConfig;
use crate::resolve::Resolver;

/// Discover every servable dynamic page under `root`.
///
/// Returns route name -> root-relative path. Traversal is lexicographic by
/// file name at every level, so route names are stable across calls and
/// platforms; when two files map to the same route name the first one
/// discovered wins. Recomputed on every call — correctness over freshness.
pub fn discover_routes(root: &Path, config: &ServerConfig) -> BTreeMap<String, PathBuf> {
    let resolver = Resolver::new(root, config);
    let mut routes = BTreeMap::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            // Skip hidden/underscore directories entirely rather than
            // descending and rejecting every file below them.
            e.depth() == 0
                || e.file_name()
                    .to_str()
                    .map(|n| !n.starts_with('.') && !n.starts_with('_'))
                    .unwrap_or(false)
        });
    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = match entry.file_name().to_str() {
            Some(n) => n,
            None => continue,
        };
        let base = match config.route_base_name(file_name) {
            Some(b) => b.to_string(),
            None => continue,
        };
        if resolver.check_allowed(entry.path()).is_err() {
            continue;
        }
        let relative = match entry.path().strip_prefix(root) {
            Ok(r) => r.to_path_buf(),
            Err(_) => continue,
        };
        let name = route_name(&relative, &base);
        routes.entry(name).or_insert(relative);
    }
    routes
}

/// Re-resolve a route name to the absolute path of its page file.
/// Round-trips with [`discover_routes`]: every discovered name maps back to
/// the file that produced it.
pub fn find_route(root: &Path, config: &ServerConfig, name: &str) -> Option<PathBuf> {
    discover_routes(root, config)
        .get(name)
        .map(|relative| root.join(relative))
}

/// Forward-slash namespacing regardless of the native separator, so links
/// generated from route names are platform-independent.
fn route_name(relative: &Path, base: &str) -> String {
    match relative.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            let mut name = String::new();
            for component in parent.components() {
                name.push_str(&component.as_os_str().to_string_lossy());
                name.push('/');
            }
            name.push_str(base);
            name
        }
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn discovers_and_namespaces_routes() {
        let dir = TempDir::new().unwrap();
        let cfg = ServerConfig::default();
        touch(&dir.path().join("page_home.py"));
        touch(&dir.path().join("docs").join("page_intro.py"));
        touch(&dir.path().join("notes.py")); // wrong prefix, invisible
        touch(&dir.path().join("page_readme.txt")); // wrong extension

        let routes = discover_routes(dir.path(), &cfg);
        let names: Vec<&str> = routes.keys().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["docs/intro", "home"]);
        assert_eq!(routes["home"], PathBuf::from("page_home.py"));
        assert_eq!(
            routes["docs/intro"],
            PathBuf::from("docs").join("page_intro.py")
        );
    }

    #[test]
    fn hidden_and_private_pages_are_invisible() {
        let dir = TempDir::new().unwrap();
        let cfg = ServerConfig::default();
        touch(&dir.path().join("_wip").join("page_draft.py"));
        touch(&dir.path().join("secret").join("page_internal.py"));
        fs::write(dir.path().join("secret").join(".private"), "").unwrap();
        touch(&dir.path().join("page_home.py"));

        let routes = discover_routes(dir.path(), &cfg);
        assert_eq!(routes.len(), 1);
        assert!(routes.contains_key("home"));
    }

    #[test]
    fn find_route_round_trips() {
        let dir = TempDir::new().unwrap();
        let cfg = ServerConfig::default();
        touch(&dir.path().join("a").join("page_x.py"));
        for (name, relative) in discover_routes(dir.path(), &cfg) {
            let found = find_route(dir.path(), &cfg, &name).unwrap();
            assert_eq!(found, dir.path().join(relative));
        }
    }
}
