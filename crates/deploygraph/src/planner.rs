//! Operation extraction
//!
//! Walks a configuration document and produces the ordered list of
//! operations a pass will execute. The walk is a tree rewrite: each node
//! may hand a replacement value back to its parent, which is how nested
//! declarations become `${id:..}` references and how `$json`-style
//! directives turn into text.

use crate::context::{FileSource, Prompter};
use crate::directive::{Directive, MetadataKey};
use crate::encode::to_json_text;
use crate::error::{Error, Result};
use crate::paths::{pluralize, required_fields, resolve_path};
use crate::types::{Operation, value_text};
use regex::Regex;
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};

const PROMPT_MARKER: &str = "!prompt:";
const PATTERN_MARKER: &str = "!pattern:";

/// Options for [`extract`]
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Directory file directives are resolved against
    pub config_dir: Option<PathBuf>,
    /// Visit sequence elements last to first (undeploy passes)
    pub reverse: bool,
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }
}

/// Extract the operations of `document`.
///
/// Nested declarations come before the declaration containing them.
/// Interactive prompts are answered during the walk, before any operation
/// runs.
pub fn extract(
    mut document: Value,
    options: &ExtractOptions,
    prompter: &mut dyn Prompter,
    files: &dyn FileSource,
) -> Result<Vec<Operation>> {
    let mut walker = Walker {
        options,
        prompter,
        files,
        ops: Vec::new(),
    };
    // the root has no parent to take a replacement
    walker.visit(&mut document, &KeyPath::root())?;
    log::debug!("extracted {} operation(s)", walker.ops.len());
    Ok(walker.ops)
}

/// Dotted location of a node, used in config error messages.
#[derive(Debug, Clone, Default)]
struct KeyPath(Vec<String>);

impl KeyPath {
    fn root() -> Self {
        Self::default()
    }

    fn child(&self, segment: impl ToString) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self(segments)
    }

    /// `<path>.<key>`, with `root` standing in for the document root.
    fn key(&self, key: &str) -> String {
        if self.0.is_empty() {
            format!("root.{key}")
        } else {
            format!("{}.{key}", self.0.join("."))
        }
    }
}

struct Walker<'a> {
    options: &'a ExtractOptions,
    prompter: &'a mut dyn Prompter,
    files: &'a dyn FileSource,
    ops: Vec<Operation>,
}

impl Walker<'_> {
    /// Visit a node. Returns the value its parent should store in its place.
    fn visit(&mut self, node: &mut Value, at: &KeyPath) -> Result<Option<Value>> {
        match node {
            Value::Array(items) => {
                let indices: Vec<usize> = if self.options.reverse {
                    (0..items.len()).rev().collect()
                } else {
                    (0..items.len()).collect()
                };
                for i in indices {
                    if let Some(replacement) = self.visit(&mut items[i], &at.child(i))? {
                        items[i] = replacement;
                    }
                }
                Ok(None)
            }
            Value::Object(map) => self.visit_mapping(map, at),
            _ => Ok(None),
        }
    }

    fn visit_mapping(&mut self, map: &mut Map<String, Value>, at: &KeyPath) -> Result<Option<Value>> {
        let mut replacement = None;
        let keys: Vec<String> = map.keys().cloned().collect();

        for key in keys {
            let Some(value) = map.get_mut(&key) else {
                continue;
            };

            if value.is_object() || value.is_array() {
                if let Some(nested) = self.visit(value, &at.child(&key))? {
                    *value = nested;
                }
            }

            if let Some(marker) = value.as_str().filter(|s| s.starts_with(PROMPT_MARKER)) {
                let answer = self.prompt(marker, &at.key(&key))?;
                *value = Value::String(answer);
            }

            let key_path = at.key(&key);
            match Directive::decode(&key) {
                Directive::Plain | Directive::Metadata(_) => {}
                Directive::Json => {
                    replacement = Some(Value::String(to_json_text(&*value)?));
                }
                Directive::Dataset => {
                    let Value::Array(items) = value else {
                        return Err(type_error(&key_path, "list", value));
                    };
                    let rows: Vec<Value> = items.iter().map(|v| json!({"name": v, "value": v})).collect();
                    replacement = Some(Value::String(to_json_text(&rows)?));
                }
                Directive::DatasetCsv => {
                    let file = self.local_file(&key_path, value, Some("csv"))?;
                    let rows = self.files.read_csv(&file)?;
                    replacement = Some(Value::String(to_json_text(&rows)?));
                }
                Directive::FileContent => {
                    let file = self.local_file(&key_path, value, None)?;
                    replacement = Some(Value::String(self.files.read_text(&file)?));
                }
                Directive::Id => {
                    let mut tokens = id_tokens(&key_path, value)?;
                    replacement = Some(Value::String(tokens.swap_remove(0)));
                }
                Directive::DeleteIds => {
                    let tokens = id_tokens(&key_path, value)?;
                    for token in &tokens {
                        let (path, name) = split_token(token);
                        self.ops.push(Operation::delete_ids(path, name));
                    }
                    *value = Value::Array(tokens.into_iter().map(Value::String).collect());
                }
                Directive::Declare(alias) => {
                    if let Some(token) = self.declare(alias, value, &key_path)? {
                        replacement = Some(token);
                    }
                }
            }
        }

        Ok(replacement)
    }

    /// Validate a resource declaration and queue its operation.
    ///
    /// Returns the reference token the parent should hold when the
    /// declaration is named.
    fn declare(&mut self, alias: &str, value: &mut Value, key_path: &str) -> Result<Option<Value>> {
        if alias.is_empty() {
            return Err(Error::config(format!("{key_path} resource alias is empty")));
        }
        let Value::Object(body) = value else {
            return Err(type_error(key_path, "dict", value));
        };

        if !["name", "id"].iter().any(|k| body.get(*k).is_some_and(is_truthy)) {
            return Err(Error::config(format!("{key_path} missing any of keys name, id")));
        }

        let path = if alias.starts_with('/') {
            alias.to_string()
        } else {
            resolve_path(&pluralize(alias))
        };

        let validate = body.shift_remove(MetadataKey::Validate.key());
        if !matches!(validate, Some(Value::Bool(false))) {
            if let Some(required) = required_fields(&path) {
                let missing: Vec<&str> = required
                    .iter()
                    .copied()
                    .filter(|k| !body.get(*k).is_some_and(is_truthy))
                    .collect();
                if !missing.is_empty() {
                    return Err(Error::config(format!(
                        "{key_path} missing required keys {}",
                        missing.join(", ")
                    )));
                }
            }
        }

        let token = body
            .get("name")
            .filter(|n| !n.is_null())
            .map(|name| Value::String(format!("${{id:{path}:{}}}", value_text(name))));

        let mut payload = body.clone();
        let mut take = |key: MetadataKey| payload.shift_remove(key.key()).filter(|v| !v.is_null());
        let entity = take(MetadataKey::Entity);
        let entity_id = take(MetadataKey::EntityId);
        let create_path = take(MetadataKey::CreatePath);
        let update_path = take(MetadataKey::UpdatePath);
        let delete_path = take(MetadataKey::DeletePath);
        let set_name = payload.shift_remove(MetadataKey::SetName.key());

        let mut op = Operation::declare(path, payload);
        op.entity = entity.as_ref().map(value_text);
        op.entity_id = entity_id;
        op.create_path = create_path.as_ref().map(value_text);
        op.update_path = update_path.as_ref().map(value_text);
        op.delete_path = delete_path.as_ref().map(value_text);
        op.set_name = set_name.as_ref().is_none_or(is_truthy);
        self.ops.push(op);

        Ok(token)
    }

    /// Ask until the answer matches the marker's pattern, if it has one.
    fn prompt(&mut self, marker: &str, key_path: &str) -> Result<String> {
        let text = marker.replacen(PROMPT_MARKER, "", 1);
        let (text, pattern) = match text.split_once(PATTERN_MARKER) {
            Some((text, pattern)) => (text.to_string(), Some(pattern.to_string())),
            None => (text, None),
        };
        let matcher = pattern
            .as_deref()
            .map(|p| Regex::new(&format!("^(?:{p})$")))
            .transpose()
            .map_err(|e| Error::config(format!("{key_path} invalid prompt pattern: {e}")))?;

        loop {
            let answer = self.prompter.ask(&text)?;
            match (&matcher, &pattern) {
                (Some(re), Some(p)) if !re.is_match(&answer) => self.prompter.rejected(&answer, p),
                _ => return Ok(answer),
            }
        }
    }

    /// Locate a file named by a directive, falling back to the config dir.
    fn local_file(&self, key_path: &str, value: &Value, ext: Option<&str>) -> Result<PathBuf> {
        let message = format!(
            "{key_path} {} must be {}file in same dir as yaml config",
            shown(value),
            ext.map(|e| format!("{e} ")).unwrap_or_default()
        );
        let Some(name) = value.as_str() else {
            return Err(Error::config(message));
        };
        if let Some(ext) = ext {
            if !name.ends_with(&format!(".{ext}")) {
                return Err(Error::config(message));
            }
        }

        let mut file = PathBuf::from(name);
        if !self.files.is_file(&file) {
            let Some(dir) = self.options.config_dir.as_deref() else {
                return Err(Error::config(format!("{message}, config_dir required")));
            };
            file = Path::new(dir).join(name);
        }
        if !self.files.is_file(&file) {
            return Err(Error::config(message));
        }
        Ok(file)
    }
}

/// Normalize `$id`/`$deleteIds` values to `${id:<canonicalPath>:<name>}`.
fn id_tokens(key_path: &str, value: &Value) -> Result<Vec<String>> {
    let invalid = || {
        Error::config(format!(
            "{key_path} must be of type str or list in format ${{id:path:name}} not {}",
            shown(value)
        ))
    };

    let entries: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };
    if entries.is_empty() {
        return Err(invalid());
    }

    entries
        .into_iter()
        .map(|entry| {
            let text = entry.as_str().ok_or_else(invalid)?;
            let inner = text
                .strip_prefix("${id:")
                .and_then(|t| t.strip_suffix('}'))
                .unwrap_or(text);
            let (path, name) = inner.split_once(':').ok_or_else(invalid)?;
            let (path, name) = (path.trim(), name.trim());
            if path.is_empty() || name.is_empty() {
                return Err(invalid());
            }
            Ok(format!("${{id:{}:{name}}}", resolve_path(path)))
        })
        .collect()
}

/// `(path, name)` of a normalized token.
fn split_token(token: &str) -> (&str, &str) {
    let inner = &token["${id:".len()..token.len() - 1];
    inner.split_once(':').unwrap_or((inner, ""))
}

fn type_error(key_path: &str, expected: &str, value: &Value) -> Error {
    Error::config(format!("{key_path} must be of type {expected} not {}", type_name(value)))
}

/// A value as quoted in config errors; a missing value reads `None`.
fn shown(value: &Value) -> String {
    if value.is_null() {
        "None".to_string()
    } else {
        value_text(value)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Presence test for required keys: null, false, zero and empty are missing.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
