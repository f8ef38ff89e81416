//! `{$dotted.path}` template interpolation over JSON context trees.
//!
//! Templates reference values in a [`serde_json::Value`] context with
//! `{$path}` tokens, where `path` is a dot-separated chain of object keys
//! and array indices (`{$data.items.0}`). Text outside tokens is literal;
//! braces not followed by `$` are literal too, so plain strings pass
//! through untouched.

use serde_json::Value;

use crate::error::{Error, Result};

/// One piece of a scanned template.
#[derive(Debug, Clone, PartialEq)]
enum Part {
    Lit(String),
    Token(String),
}

/// Split a template into literal runs and `{$path}` tokens.
///
/// Malformed tokens (no closing `}`, empty path) are kept as literal text.
fn scan(template: &str) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut lit = String::new();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '{' && chars.peek() == Some(&'$') {
            chars.next(); // consume '$'
            let mut path = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                path.push(c);
            }
            if closed && !path.is_empty() {
                if !lit.is_empty() {
                    parts.push(Part::Lit(std::mem::take(&mut lit)));
                }
                parts.push(Part::Token(path));
            } else {
                // Malformed; emit the literal.
                lit.push_str("{$");
                lit.push_str(&path);
                if closed {
                    lit.push('}');
                }
            }
        } else {
            lit.push(ch);
        }
    }

    if !lit.is_empty() {
        parts.push(Part::Lit(lit));
    }
    parts
}

/// List the paths a template references, in order of appearance.
///
/// An empty result means the template has nothing to substitute and can be
/// used verbatim.
pub fn tokens(template: &str) -> Vec<String> {
    scan(template)
        .into_iter()
        .filter_map(|p| match p {
            Part::Token(path) => Some(path),
            Part::Lit(_) => None,
        })
        .collect()
}

/// Walk a dot-separated path through objects and arrays.
fn resolve<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = ctx;
    for seg in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Render a template against a context, preserving JSON types.
///
/// A template that is exactly one token yields the referenced value itself,
/// whatever its type. Any other template yields a string with each token
/// replaced by the value's text form (strings raw, everything else compact
/// JSON). An unresolvable path is an error.
pub fn render(template: &str, ctx: &Value) -> Result<Value> {
    let parts = scan(template);

    if let [Part::Token(path)] = parts.as_slice() {
        return resolve(ctx, path)
            .cloned()
            .ok_or_else(|| unresolved(path));
    }

    let mut out = String::new();
    for part in parts {
        match part {
            Part::Lit(text) => out.push_str(&text),
            Part::Token(path) => {
                let value = resolve(ctx, &path).ok_or_else(|| unresolved(&path))?;
                match value {
                    Value::String(s) => out.push_str(s),
                    other => out.push_str(&other.to_string()),
                }
            },
        }
    }
    Ok(Value::String(out))
}

/// Render a template to plain text.
///
/// Like [`render`], but a single-token template resolving to a non-string
/// value is flattened to its compact JSON form.
pub fn render_text(template: &str, ctx: &Value) -> Result<String> {
    match render(template, ctx)? {
        Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

/// Render every string inside a JSON value, recursing through arrays and
/// objects. Non-string leaves pass through unchanged, so a structured
/// template keeps its shape with only its templated strings substituted.
pub fn render_deep(value: &Value, ctx: &Value) -> Result<Value> {
    match value {
        Value::String(template) => render(template, ctx),
        Value::Array(items) => items
            .iter()
            .map(|item| render_deep(item, ctx))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(entries) => {
            let mut out = serde_json::Map::with_capacity(entries.len());
            for (key, entry) in entries {
                out.insert(key.clone(), render_deep(entry, ctx)?);
            }
            Ok(Value::Object(out))
        },
        other => Ok(other.clone()),
    }
}

fn unresolved(path: &str) -> Error {
    Error::message(format!("unresolved template path: {path}"))
}
