use std::path::Path;

use futures::future::{BoxFuture, FutureExt};

use crate::config::ServerConfig;
use crate::context::Context;
use crate::errors::RenderError;
use crate::executor::{self, Scope};
use crate::expression::{self, EvalError, Expr};
use crate::resolve::{Base, Resolver};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Expands `{{ ... }}` markers in captured page output.
///
/// Markers are non-nested: the first `}}` after an opening `{{` closes the
/// marker. Evaluation is strictly left-to-right and sequential; a marker's
/// substitution is final before the next one is looked at. Every failure
/// inside a marker is recovered locally as an inline placeholder so the rest
/// of the document still renders.
pub struct Expander {
    resolver: Resolver,
    config: ServerConfig,
}

impl Expander {
    pub fn new(root: impl Into<std::path::PathBuf>, config: ServerConfig) -> Self {
        let root = root.into();
        Self {
            resolver: Resolver::new(root, &config),
            config,
        }
    }

    pub async fn expand(&self, raw: &str, scope: &Scope) -> String {
        self.expand_at_depth(raw, scope, 0).await
    }

    /// Recursive includes thread the depth through every call and fail
    /// closed past the configured ceiling, so an include cycle terminates
    /// instead of hanging the request.
    fn expand_at_depth<'a>(
        &'a self,
        raw: &'a str,
        scope: &'a Scope,
        depth: usize,
    ) -> BoxFuture<'a, String> {
        async move {
            let mut out = String::with_capacity(raw.len());
            let mut rest = raw;
            while let Some(start) = rest.find(OPEN) {
                let after_open = &rest[start + OPEN.len()..];
                let Some(end) = after_open.find(CLOSE) else {
                    // Unterminated marker: not a marker at all, pass through.
                    break;
                };
                out.push_str(&rest[..start]);
                let content = after_open[..end].trim();
                out.push_str(&self.resolve_marker(content, scope, depth).await);
                rest = &after_open[end + CLOSE.len()..];
            }
            out.push_str(rest);
            out
        }
        .boxed()
    }

    async fn resolve_marker(&self, content: &str, scope: &Scope, depth: usize) -> String {
        // File-reference prefixes first. `.\` and `..\` resolve against the
        // root; `./` and `../` against the current page's directory. The
        // upward-traversal forms keep their leading dots so the resolver
        // sees (and containment-checks) the traversal.
        if let Some(reference) = content.strip_prefix(".\\") {
            return self.include_file(reference, Base::Root, scope, depth).await;
        }
        if let Some(reference) = content.strip_prefix("./") {
            return self
                .include_file(reference, Base::Page(&scope.page_dir), scope, depth)
                .await;
        }
        if content.starts_with("..\\") {
            return self.include_file(content, Base::Root, scope, depth).await;
        }
        if content.starts_with("../") {
            return self
                .include_file(content, Base::Page(&scope.page_dir), scope, depth)
                .await;
        }

        // Not a file reference: expression handling.
        let (awaited, expr_src) = match content.strip_prefix("await ") {
            Some(rest) => (true, rest.trim_start()),
            None => (false, content),
        };
        let expr = match expression::parse_expr(expr_src) {
            Ok(expr) => expr,
            Err(e) => return format!("[Error: {e}]"),
        };
        if matches!(expr, Expr::Call { .. }) && !awaited {
            return "[Error: resource calls must be awaited]".to_string();
        }
        match expression::eval(&expr, &scope.context).await {
            Ok(value) => expression::render_value(&value),
            Err(EvalError::UnknownName(name)) => {
                // Explicit two-step lookup: the name is not a scope value,
                // so a single bare identifier may still name a fragment
                // file next to the current page.
                if expression::is_bare_identifier(content) {
                    self.include_fragment(content, scope, depth).await
                } else {
                    format!("[Error: name '{name}' is not defined]")
                }
            }
            Err(EvalError::Fault(msg)) => format!("[Error: {msg}]"),
        }
    }

    /// Explicit include: resolve, contain, execute, recursively expand.
    /// Denied or missing targets substitute a placeholder; nothing aborts
    /// the enclosing page.
    async fn include_file(
        &self,
        reference: &str,
        base: Base<'_>,
        scope: &Scope,
        depth: usize,
    ) -> String {
        if depth >= self.config.max_include_depth {
            scope.debug(&format!(
                "include depth limit hit at '{reference}', failing closed"
            ));
            return format!(
                "[Error including file '{reference}': {}]",
                RenderError::DepthExceeded(self.config.max_include_depth)
            );
        }
        let path = match self.resolver.resolve(reference, base) {
            Ok(path) => path,
            Err(_) => return not_found_placeholder(reference),
        };
        if !path.is_file() {
            return not_found_placeholder(reference);
        }
        match self.render_included(&path, scope, depth).await {
            Ok(rendered) => rendered,
            Err(e) => format!("[Error including file '{reference}': {e}]"),
        }
    }

    /// Implicit include for a bare identifier: `<identifier>.<ext>` in the
    /// current page's directory, or an undefined-name placeholder.
    async fn include_fragment(&self, identifier: &str, scope: &Scope, depth: usize) -> String {
        if depth >= self.config.max_include_depth {
            scope.debug(&format!(
                "include depth limit hit at '{identifier}', failing closed"
            ));
            return format!(
                "[Error including file '{identifier}': {}]",
                RenderError::DepthExceeded(self.config.max_include_depth)
            );
        }
        let reference = format!("{identifier}.{}", self.config.page_extension);
        let path = match self.resolver.resolve(&reference, Base::Page(&scope.page_dir)) {
            Ok(path) => path,
            Err(_) => return format!("[Error: name '{identifier}' is not defined]"),
        };
        if !path.is_file() {
            return format!("[Error: name '{identifier}' is not defined]");
        }
        match self.render_included(&path, scope, depth).await {
            Ok(rendered) => rendered,
            Err(e) => format!("[Error including file '{identifier}': {e}]"),
        }
    }

    /// Run an included file with the same request context and expand its
    /// output one level deeper. Included files may themselves include.
    async fn render_included(
        &self,
        path: &Path,
        scope: &Scope,
        depth: usize,
    ) -> Result<String, RenderError> {
        let context = std::sync::Arc::clone(&scope.context);
        let (sub_raw, sub_scope) = executor::execute(path, context).await?;
        Ok(self.expand_at_depth(&sub_raw, &sub_scope, depth + 1).await)
    }
}

fn not_found_placeholder(reference: &str) -> String {
    format!("[Error: File '{reference}' not found or access denied]")
}

/// Render one page end to end: execute it, then expand its output.
/// Top-level execution faults propagate; everything inside expansion is
/// recovered inline.
pub async fn render_page(
    root: &Path,
    page_path: &Path,
    context: std::sync::Arc<Context>,
    config: &ServerConfig,
) -> Result<String, RenderError> {
    let expander = Expander::new(root, config.clone());
    let (raw, scope) = executor::execute(page_path, context).await?;
    Ok(expander.expand(&raw, &scope).await)
}
