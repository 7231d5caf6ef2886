// src/expression.rs
use serde_json::Value;

use crate::context::Context;
use crate::errors::{RenderError, Result};
use crate::parser::{Cursor, ParseError};

/// A marker expression. The grammar is deliberately tiny: dotted/bracket
/// lookups rooted at a scope name, resource method calls with string-literal
/// arguments, and quoted string literals. Everything a page may reach is
/// enumerated by [`Context`]; there is no open evaluation environment.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    /// `context.config['server_name']`, `context.routes[0]`
    Path(Vec<Seg>),
    /// `context.resources.list_content('docs')`
    Call { path: Vec<Seg>, args: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Seg {
    Name(String),
    Index(i64),
}

/// How an expression failed. `UnknownName` is kept apart from `Fault` so the
/// expander can try the fragment-file fallback for bare identifiers instead
/// of treating a runtime fault as a dispatch signal.
#[derive(Debug)]
pub enum EvalError {
    UnknownName(String),
    Fault(String),
}

impl From<EvalError> for RenderError {
    fn from(e: EvalError) -> Self {
        match e {
            EvalError::UnknownName(name) => RenderError::UndefinedReference(name),
            EvalError::Fault(msg) => RenderError::EvaluationFault(msg),
        }
    }
}

pub fn parse_expr(input: &str) -> std::result::Result<Expr, ParseError> {
    let mut c = Cursor::new(input);
    let expr = parse_node(&mut c)?;
    c.skip_ws();
    if !c.eof() {
        return Err(ParseError::InvalidSyntax("trailing input".into()));
    }
    Ok(expr)
}

/// True when `input` is a single bare identifier (no dots, brackets, calls).
/// Only such markers are eligible for the implicit fragment include.
pub fn is_bare_identifier(input: &str) -> bool {
    !input.is_empty()
        && !input.starts_with(|c: char| c.is_ascii_digit())
        && input.chars().all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn parse_node(c: &mut Cursor) -> std::result::Result<Expr, ParseError> {
    c.skip_ws();
    if c.peek_char() == Some('"') || c.peek_char() == Some('\'') {
        return Ok(Expr::Str(c.parse_quoted_string()?));
    }
    let mut path = vec![Seg::Name(c.parse_identifier()?)];
    loop {
        if c.consume_char('.') {
            path.push(Seg::Name(c.parse_identifier()?));
            continue;
        }
        if c.consume_char('[') {
            c.skip_ws();
            if c.peek_char() == Some('"') || c.peek_char() == Some('\'') {
                path.push(Seg::Name(c.parse_quoted_string()?));
            } else {
                path.push(Seg::Index(c.parse_int()?));
            }
            c.skip_ws();
            c.expect(']')?;
            continue;
        }
        if c.consume_char('(') {
            let args = parse_args(c)?;
            c.expect(')')?;
            return Ok(Expr::Call { path, args });
        }
        break;
    }
    Ok(Expr::Path(path))
}

fn parse_args(c: &mut Cursor) -> std::result::Result<Vec<Expr>, ParseError> {
    let mut out = Vec::new();
    c.skip_ws();
    if c.peek_char() == Some(')') {
        return Ok(out);
    }
    loop {
        out.push(parse_node(c)?);
        c.skip_ws();
        if c.consume_char(',') {
            c.skip_ws();
            continue;
        }
        break;
    }
    Ok(out)
}

/// Evaluate an expression against the request context. Resource calls are
/// the only suspension point; plain path lookups never await.
pub async fn eval(expr: &Expr, context: &Context) -> std::result::Result<Value, EvalError> {
    match expr {
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Path(path) => eval_path(path, context),
        Expr::Call { path, args } => eval_call(path, args, context).await,
    }
}

fn eval_path(path: &[Seg], context: &Context) -> std::result::Result<Value, EvalError> {
    let root = match path.first() {
        Some(Seg::Name(name)) => name,
        _ => return Err(EvalError::Fault("expression must start with a name".into())),
    };
    if root != "context" {
        return Err(EvalError::UnknownName(root.clone()));
    }
    let mut current = context.json_view();
    for seg in &path[1..] {
        current = match (seg, current) {
            (Seg::Name(key), Value::Object(map)) => map
                .get(key)
                .ok_or_else(|| EvalError::Fault(format!("unknown field '{key}'")))?,
            (Seg::Index(i), Value::Array(arr)) => {
                let idx = if *i < 0 { arr.len() as i64 + *i } else { *i };
                usize::try_from(idx)
                    .ok()
                    .and_then(|idx| arr.get(idx))
                    .ok_or_else(|| EvalError::Fault(format!("index {i} out of range")))?
            }
            (Seg::Name(key), _) => {
                return Err(EvalError::Fault(format!("cannot look up '{key}' here")))
            }
            (Seg::Index(i), _) => {
                return Err(EvalError::Fault(format!("cannot index [{i}] here")))
            }
        };
    }
    Ok(current.clone())
}

async fn eval_call(
    path: &[Seg],
    args: &[Expr],
    context: &Context,
) -> std::result::Result<Value, EvalError> {
    let names: Vec<&str> = path
        .iter()
        .map(|seg| match seg {
            Seg::Name(n) => Some(n.as_str()),
            Seg::Index(_) => None,
        })
        .collect::<Option<_>>()
        .ok_or_else(|| EvalError::Fault("cannot call an indexed value".into()))?;
    let method = match names.as_slice() {
        ["context", "resources", method] => *method,
        [root, ..] if *root != "context" => {
            return Err(EvalError::UnknownName((*root).to_string()))
        }
        _ => {
            return Err(EvalError::Fault(format!(
                "'{}' is not callable",
                names.join(".")
            )))
        }
    };
    let mut literal_args = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Expr::Str(s) => literal_args.push(s.as_str()),
            _ => {
                return Err(EvalError::Fault(
                    "resource arguments must be string literals".into(),
                ))
            }
        }
    }
    let result: Result<Value> = match (method, literal_args.as_slice()) {
        ("get_public_ip", []) => context
            .resources
            .get_public_ip()
            .await
            .map(Value::String),
        ("list_routes", []) => context
            .resources
            .list_routes()
            .await
            .map(|routes| Value::Array(routes.into_iter().map(Value::String).collect())),
        ("list_content", []) => context
            .resources
            .list_content(None)
            .await
            .map(|names| Value::Array(names.into_iter().map(Value::String).collect())),
        ("list_content", [sub]) => context
            .resources
            .list_content(Some(sub))
            .await
            .map(|names| Value::Array(names.into_iter().map(Value::String).collect())),
        _ => {
            return Err(EvalError::Fault(format!(
                "no resource method '{method}' with {} argument(s)",
                literal_args.len()
            )))
        }
    };
    result.map_err(|e| EvalError::Fault(e.to_string()))
}

/// Substitution form of a value: strings drop their quotes, everything else
/// renders as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
