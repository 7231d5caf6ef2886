use std::path::{Component, Path, PathBuf};

use crate::config::ServerConfig;
use crate::errors::{RenderError, Result};

/// Which directory a relative reference resolves against.
#[derive(Debug, Clone, Copy)]
pub enum Base<'a> {
    /// The configured root (markers written with `.\` / `..\`).
    Root,
    /// The directory of the currently executing page (`./` / `../`).
    Page(&'a Path),
}

/// Maps URL paths and marker references to filesystem paths confined to a
/// single root directory. Every candidate path, whether served directly or
/// pulled in by an include, goes through [`Resolver::resolve`].
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
    private_marker: String,
}

impl Resolver {
    pub fn new(root: impl Into<PathBuf>, config: &ServerConfig) -> Self {
        Self {
            root: root.into(),
            private_marker: config.private_marker.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `reference` against `base`, collapsing `.`/`..` lexically,
    /// then enforce containment and the hidden/private rules. The target
    /// need not exist; existence is the caller's concern.
    pub fn resolve(&self, reference: &str, base: Base<'_>) -> Result<PathBuf> {
        let base_dir = match base {
            Base::Root => self.root.as_path(),
            Base::Page(dir) => dir,
        };
        let mut candidate = base_dir.to_path_buf();
        // Marker syntax accepts both separators; normalize before walking.
        let normalized = reference.replace('\\', "/");
        for segment in normalized.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    // Popping above the filesystem root just leaves the path
                    // unchanged; the containment check below still fires.
                    candidate.pop();
                }
                name => candidate.push(name),
            }
        }
        self.check_allowed(&candidate)?;
        Ok(candidate)
    }

    /// Dispatch entry: strip the query string and leading slash, then
    /// resolve root-relative.
    pub fn url_to_path(&self, url_path: &str) -> Result<PathBuf> {
        let path = url_path.split('?').next().unwrap_or("");
        self.resolve(path.trim_start_matches('/'), Base::Root)
    }

    /// Containment plus the permanent exclusions: no path outside the root,
    /// no segment starting with a dot or underscore, no ancestor directory
    /// carrying the private sentinel file.
    pub fn check_allowed(&self, absolute: &Path) -> Result<()> {
        let relative = absolute
            .strip_prefix(&self.root)
            .map_err(|_| RenderError::ResolutionDenied(absolute.display().to_string()))?;
        for component in relative.components() {
            let name = match component {
                Component::Normal(name) => name.to_string_lossy(),
                _ => return Err(RenderError::ResolutionDenied(absolute.display().to_string())),
            };
            if name.starts_with('.') || name.starts_with('_') {
                return Err(RenderError::ResolutionDenied(absolute.display().to_string()));
            }
        }
        if self.has_private_ancestor(absolute) {
            return Err(RenderError::ResolutionDenied(absolute.display().to_string()));
        }
        Ok(())
    }

    /// Private status is inherited downward: walk from the target's parent
    /// up to (and including) the root looking for the sentinel. A directory
    /// requested directly is checked against its own sentinel too.
    fn has_private_ancestor(&self, absolute: &Path) -> bool {
        let mut current = if absolute.is_dir() {
            Some(absolute)
        } else {
            absolute.parent()
        };
        while let Some(dir) = current {
            if !dir.starts_with(&self.root) {
                break;
            }
            if dir.join(&self.private_marker).exists() {
                return true;
            }
            if dir == self.root {
                break;
            }
            current = dir.parent();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Resolver) {
        let dir = TempDir::new().unwrap();
        let resolver = Resolver::new(dir.path(), &ServerConfig::default());
        (dir, resolver)
    }

    #[test]
    fn plain_reference_resolves_under_root() {
        let (dir, resolver) = setup();
        let got = resolver.resolve("pages/page_home.py", Base::Root).unwrap();
        assert_eq!(got, dir.path().join("pages").join("page_home.py"));
    }

    #[test]
    fn upward_traversal_cannot_escape_root() {
        let (_dir, resolver) = setup();
        let err = resolver.resolve("../../etc/secret", Base::Root).unwrap_err();
        assert!(matches!(err, RenderError::ResolutionDenied(_)));
    }

    #[test]
    fn page_relative_traversal_is_confined() {
        let (dir, resolver) = setup();
        let page_dir = dir.path().join("a").join("b");
        // One level up stays inside the root...
        let ok = resolver.resolve("../sibling.py", Base::Page(&page_dir)).unwrap();
        assert_eq!(ok, dir.path().join("a").join("sibling.py"));
        // ...three levels up does not.
        let err = resolver
            .resolve("../../../etc/passwd", Base::Page(&page_dir))
            .unwrap_err();
        assert!(matches!(err, RenderError::ResolutionDenied(_)));
    }

    #[test]
    fn backslash_references_are_normalized() {
        let (dir, resolver) = setup();
        let got = resolver.resolve("pages\\page_home.py", Base::Root).unwrap();
        assert_eq!(got, dir.path().join("pages").join("page_home.py"));
    }

    #[test]
    fn hidden_and_underscore_segments_denied() {
        let (_dir, resolver) = setup();
        assert!(resolver.resolve(".git/config", Base::Root).is_err());
        assert!(resolver.resolve("_drafts/page_x.py", Base::Root).is_err());
        assert!(resolver.resolve("ok/.hidden/file", Base::Root).is_err());
    }

    #[test]
    fn private_sentinel_denies_descendants() {
        let (dir, resolver) = setup();
        let secret = dir.path().join("secret");
        fs::create_dir_all(secret.join("deep")).unwrap();
        fs::write(secret.join(".private"), "").unwrap();
        fs::write(secret.join("deep").join("file.txt"), "x").unwrap();
        assert!(resolver.resolve("secret/deep/file.txt", Base::Root).is_err());
        // The marked directory itself is unservable when requested directly.
        assert!(resolver.resolve("secret", Base::Root).is_err());
        // A sibling without the sentinel is unaffected.
        fs::create_dir_all(dir.path().join("open")).unwrap();
        assert!(resolver.resolve("open/file.txt", Base::Root).is_ok());
    }

    #[test]
    fn url_query_string_is_ignored() {
        let (dir, resolver) = setup();
        let got = resolver.url_to_path("/data/file.json?download=1").unwrap();
        assert_eq!(got, dir.path().join("data").join("file.json"));
    }
}
