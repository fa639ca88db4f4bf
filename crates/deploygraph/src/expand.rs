//! Variable expansion
//!
//! Resolves `${kind:arg..}` tokens inside a value tree just before the value
//! is sent to the remote API. Only `${id:<path>:<name>}` is understood;
//! tokens of any other kind are left as literal text.

use crate::context::RemoteApi;
use crate::error::{Error, Result};
use crate::paths::resolve_path;
use crate::types::value_text;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{[^}]+\}").expect("token pattern is valid"));

/// Token → resolved value memo for one deploy pass
///
/// `None` marks a token whose kind is not resolvable; it stays literal.
#[derive(Debug, Default, Clone)]
pub struct ExpandCache {
    resolved: HashMap<String, Option<Value>>,
}

impl ExpandCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a token with a known value (skips the remote lookup).
    pub fn insert(&mut self, token: impl Into<String>, value: Value) {
        self.resolved.insert(token.into(), Some(value));
    }

    pub fn get(&self, token: &str) -> Option<&Value> {
        self.resolved.get(token).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Resolve one token, consulting the memo first.
    fn resolve<R: RemoteApi + ?Sized>(&mut self, token: &str, remote: &R) -> Result<Option<Value>> {
        if let Some(hit) = self.resolved.get(token) {
            log::debug!("cache hit {token}");
            return Ok(hit.clone());
        }
        let value = resolve_token(token, remote)?;
        self.resolved.insert(token.to_string(), value.clone());
        Ok(value)
    }
}

/// Expand every token in `value`.
///
/// Mappings and sequences are expanded element-wise; other scalars are
/// returned unchanged.
pub fn expand<R: RemoteApi + ?Sized>(value: &Value, remote: &R, cache: &mut ExpandCache) -> Result<Value> {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), expand(v, remote, cache)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|v| expand(v, remote, cache))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::String(s) => expand_str(s, remote, cache),
        other => Ok(other.clone()),
    }
}

/// Expand the tokens in one string.
///
/// A string that is exactly one token becomes the resolved value with its
/// native type. Otherwise each distinct token is substituted as text, in
/// sorted token order.
pub fn expand_str<R: RemoteApi + ?Sized>(s: &str, remote: &R, cache: &mut ExpandCache) -> Result<Value> {
    let tokens: BTreeSet<&str> = TOKEN_RE.find_iter(s).map(|m| m.as_str()).collect();
    if tokens.is_empty() {
        return Ok(Value::String(s.to_string()));
    }

    if tokens.len() == 1 && tokens.contains(s) {
        return Ok(cache.resolve(s, remote)?.unwrap_or_else(|| Value::String(s.to_string())));
    }

    let mut text = s.to_string();
    for token in tokens {
        if let Some(value) = cache.resolve(token, remote)? {
            text = text.replace(token, &value_text(&value));
        }
    }
    Ok(Value::String(text))
}

/// Expand an optional string field, keeping it a string.
pub(crate) fn expand_text<R: RemoteApi + ?Sized>(
    s: Option<&str>,
    remote: &R,
    cache: &mut ExpandCache,
) -> Result<Option<String>> {
    s.map(|s| expand_str(s, remote, cache).map(|v| value_text(&v)))
        .transpose()
}

fn resolve_token<R: RemoteApi + ?Sized>(token: &str, remote: &R) -> Result<Option<Value>> {
    let inner = &token[2..token.len() - 1];
    let mut parts = inner.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("id"), Some(path), Some(name)) => {
            let path = resolve_path(path);
            let id = remote
                .lookup_by_name(&path, name)?
                .and_then(|object| object.get("id").filter(|id| !id.is_null()).cloned());
            match id {
                Some(id) => {
                    log::debug!("resolved {token} -> {}", value_text(&id));
                    Ok(Some(id))
                }
                None => Err(Error::LookupNotFound {
                    path,
                    name: name.to_string(),
                }),
            }
        }
        _ => {
            log::debug!("leaving unknown token {token} as is");
            Ok(None)
        }
    }
}
