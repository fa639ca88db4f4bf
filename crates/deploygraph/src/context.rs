//! Collaborator traits
//!
//! These traits let the engine run without depending on a specific HTTP
//! client, terminal, or filesystem. Implementations are supplied by the
//! caller when building a [`crate::Deployer`].

use crate::error::{Error, Result};
use crate::paths::{resolve_entity_name, resolve_path, singularize};
use crate::types::{Action, Applied, value_text};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Remote management API
///
/// Paths handed to implementations are canonical (see
/// [`crate::paths::resolve_path`]) or caller-supplied overrides.
pub trait RemoteApi {
    /// Find an object by exact name, `None` when absent.
    fn lookup_by_name(&self, path: &str, name: &str) -> Result<Option<Value>>;

    /// Create an object, returning the raw response body.
    fn create(&self, path: &str, body: &Value) -> Result<Value>;

    /// Replace the object with `id`, returning the raw response body.
    fn update(&self, path: &str, id: &Value, body: &Value) -> Result<Value>;

    /// Delete the object with `id`.
    fn delete_by_id(&self, path: &str, id: &Value, force: bool) -> Result<()>;

    /// Names and ids of the objects whose name starts with `prefix`, in listing order.
    fn list_by_name_prefix(&self, path: &str, prefix: &str) -> Result<IndexMap<String, Value>>;
}

/// Upsert and delete semantics shared by every [`RemoteApi`]
pub trait RemoteApiExt {
    /// Id of the object named `name`, unless `known` already supplies one.
    fn existing_id(&self, path: &str, name: Option<&str>, known: Option<&Value>) -> Result<Option<Value>>;

    /// Create the object if no object with this name exists, else update it.
    fn upsert(&self, request: &UpsertRequest<'_>) -> Result<Applied>;

    /// Delete by name or id. Absence is not an error: returns `None`.
    fn delete(
        &self,
        path: &str,
        name: Option<&str>,
        entity: Option<&str>,
        id: Option<&Value>,
        force: bool,
    ) -> Result<Option<Applied>>;
}

/// Arguments to [`RemoteApiExt::upsert`]
#[derive(Debug, Clone)]
pub struct UpsertRequest<'a> {
    pub path: &'a str,
    pub name: Option<&'a str>,
    pub payload: &'a Map<String, Value>,
    pub entity: Option<&'a str>,
    pub id: Option<&'a Value>,
    pub set_name: bool,
    pub create_path: Option<&'a str>,
    pub update_path: Option<&'a str>,
}

impl<'a> UpsertRequest<'a> {
    pub fn new(path: &'a str, name: Option<&'a str>, payload: &'a Map<String, Value>) -> Self {
        Self {
            path,
            name,
            payload,
            entity: None,
            id: None,
            set_name: true,
            create_path: None,
            update_path: None,
        }
    }
}

impl<R: RemoteApi + ?Sized> RemoteApiExt for R {
    fn existing_id(&self, path: &str, name: Option<&str>, known: Option<&Value>) -> Result<Option<Value>> {
        if let Some(id) = known {
            return Ok(Some(id.clone()));
        }
        let Some(name) = name else {
            return Ok(None);
        };
        Ok(self
            .lookup_by_name(path, name)?
            .and_then(|object| object.get("id").filter(|id| !id.is_null()).cloned()))
    }

    fn upsert(&self, request: &UpsertRequest<'_>) -> Result<Applied> {
        let entity = resolve_entity_name(&resolve_path(request.path), request.entity, false);
        let singular = singularize(&entity).to_string();
        let existing = self.existing_id(request.path, request.name, request.id)?;

        let body = if request.set_name {
            Value::Object(wrap_payload(request.payload, &singular, request.name))
        } else {
            Value::Object(request.payload.clone())
        };

        let (action, id) = match existing {
            None => {
                let create_path = request.create_path.unwrap_or(request.path);
                let response = self.create(create_path, &body)?;
                let id = created_id(&response).ok_or_else(|| Error::AmbiguousCreateResponse {
                    path: resolve_path(create_path),
                })?;
                (Action::Created, id)
            }
            Some(id) => {
                let update_path = request.update_path.unwrap_or(request.path);
                self.update(update_path, &id, &body)?;
                (Action::Updated, id)
            }
        };

        // an unnamed upsert is reported by its id
        Ok(Applied {
            action,
            entity: singular,
            name: Some(request.name.map_or_else(|| value_text(&id), str::to_string)),
            id,
        })
    }

    fn delete(
        &self,
        path: &str,
        name: Option<&str>,
        entity: Option<&str>,
        id: Option<&Value>,
        force: bool,
    ) -> Result<Option<Applied>> {
        let Some(id) = self.existing_id(path, name, id)? else {
            log::debug!("nothing to delete at {path} for {}", name.unwrap_or("-"));
            return Ok(None);
        };
        self.delete_by_id(path, &id, force)?;
        Ok(Some(Applied {
            action: Action::Deleted,
            entity: resolve_entity_name(&resolve_path(path), entity, true),
            name: name.map(str::to_string),
            id,
        }))
    }
}

/// Wrap the payload under its singular resource-type key and set `name`.
///
/// A payload that is already wrapped is left as is apart from the name.
fn wrap_payload(payload: &Map<String, Value>, singular: &str, name: Option<&str>) -> Map<String, Value> {
    let mut body = match payload.get(singular) {
        Some(Value::Object(_)) => payload.clone(),
        _ => {
            let mut wrapped = Map::new();
            wrapped.insert(singular.to_string(), Value::Object(payload.clone()));
            wrapped
        }
    };
    if let (Some(name), Some(Value::Object(inner))) = (name, body.get_mut(singular)) {
        inner.insert("name".to_string(), Value::String(name.to_string()));
    }
    body
}

/// Id from a create response: top-level `id`, else the first nested mapping's `id`.
fn created_id(response: &Value) -> Option<Value> {
    let object = response.as_object()?;
    if let Some(id) = object.get("id") {
        return Some(id.clone());
    }
    object
        .values()
        .find(|v| v.is_object())
        .and_then(|nested| nested.get("id"))
        .cloned()
}

/// Receives one human-readable notice per remote effect
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

/// Notifier that drops every message
pub struct Silent;

impl Notifier for Silent {
    fn notify(&mut self, _message: &str) {}
}

/// Notifier that keeps messages in a shared buffer
///
/// Clones share the buffer, so a caller can hand one clone to a
/// [`crate::Deployer`] and read the messages back through another.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    messages: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Drain the buffer.
    pub fn take(&self) -> Vec<String> {
        self.messages.lock().map(|mut m| std::mem::take(&mut *m)).unwrap_or_default()
    }
}

impl Notifier for Recorder {
    fn notify(&mut self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

/// Operator input for `!prompt:` values
pub trait Prompter {
    /// Ask once and return the raw answer.
    fn ask(&mut self, text: &str) -> Result<String>;

    /// Called when an answer did not match the required pattern.
    fn rejected(&mut self, _value: &str, _pattern: &str) {}
}

/// Prompter for non-interactive runs
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn ask(&mut self, text: &str) -> Result<String> {
        Err(Error::config(format!("prompt '{text}' requires an interactive operator")))
    }
}

/// Local file access for file-reading directives
pub trait FileSource {
    fn is_file(&self, path: &Path) -> bool;

    fn read_text(&self, path: &Path) -> Result<String>;

    /// Rows of a CSV file with a header line, as ordered header → value maps.
    fn read_csv(&self, path: &Path) -> Result<Vec<Map<String, Value>>>;
}

/// Reads from the local filesystem
pub struct LocalFiles;

impl FileSource for LocalFiles {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| Error::io(path, e))
    }

    fn read_csv(&self, path: &Path) -> Result<Vec<Map<String, Value>>> {
        let csv_error = |e: csv::Error| Error::Document {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
        let headers = reader.headers().map_err(csv_error)?.clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            let row = headers
                .iter()
                .zip(record.iter())
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect();
            rows.push(row);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryRemote;
    use serde_json::json;
    use std::io::Write;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_wrap_payload() {
        let body = wrap_payload(&payload(json!({"type": "text"})), "optionType", Some("foo"));
        assert_eq!(
            Value::Object(body),
            json!({"optionType": {"type": "text", "name": "foo"}})
        );
    }

    #[test]
    fn test_wrap_payload_already_wrapped() {
        let body = wrap_payload(
            &payload(json!({"optionType": {"type": "text"}})),
            "optionType",
            Some("foo"),
        );
        assert_eq!(
            Value::Object(body),
            json!({"optionType": {"type": "text", "name": "foo"}})
        );
    }

    #[test]
    fn test_created_id_conventions() {
        assert_eq!(created_id(&json!({"id": 5})), Some(json!(5)));
        assert_eq!(
            created_id(&json!({"success": true, "job": {"id": "9"}})),
            Some(json!("9"))
        );
        assert_eq!(created_id(&json!({"bar": {"ID": "99"}})), None);
        assert_eq!(created_id(&json!({"success": true})), None);
        assert_eq!(created_id(&json!("text")), None);
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        let remote = MemoryRemote::new();
        let data = payload(json!({"type": "text", "description": "foo"}));
        let request = UpsertRequest::new("/api/library/option-types", Some("foo"), &data);

        let created = remote.upsert(&request).unwrap();
        assert_eq!(created.to_string(), "created optionType foo [1]");

        let updated = remote.upsert(&request).unwrap();
        assert_eq!(updated.to_string(), "updated optionType foo [1]");

        let stored = remote.object("/api/library/option-types", "1").unwrap();
        assert_eq!(stored["name"], json!("foo"));
        assert_eq!(stored["description"], json!("foo"));
    }

    #[test]
    fn test_upsert_and_delete_with_alias_keep_entity_casing() {
        let remote = MemoryRemote::new();
        let data = payload(json!({"type": "text"}));

        let created = remote.upsert(&UpsertRequest::new("optionTypes", Some("foo"), &data)).unwrap();
        assert_eq!(created.to_string(), "created optionType foo [1]");
        assert_eq!(
            remote.bodies(),
            vec![json!({"optionType": {"type": "text", "name": "foo"}})]
        );
        assert_eq!(remote.calls(), vec!["POST /api/library/option-types"]);

        let deleted = remote.delete("option-types", Some("foo"), None, None, false).unwrap().unwrap();
        assert_eq!(deleted.to_string(), "deleted optionType foo [1]");
    }

    #[test]
    fn test_upsert_without_set_name_sends_payload_as_is() {
        let remote = MemoryRemote::new();
        let data = payload(json!({"optionType": {"name": "foo", "type": "text"}}));
        let mut request = UpsertRequest::new("optionTypes", Some("foo"), &data);
        request.set_name = false;

        remote.upsert(&request).unwrap();
        let stored = remote.object("optionTypes", "1").unwrap();
        assert_eq!(stored["type"], json!("text"));
    }

    #[test]
    fn test_upsert_by_id_reports_id_as_name() {
        let remote = MemoryRemote::new();
        remote.seed("/api/tasks", json!({"id": "4", "name": "t"}));
        let data = payload(json!({"code": "x"}));
        let mut request = UpsertRequest::new("/api/tasks", None, &data);
        let id = json!("4");
        request.id = Some(&id);

        let applied = remote.upsert(&request).unwrap();
        assert_eq!(applied.to_string(), "updated task 4 [4]");
    }

    #[test]
    fn test_upsert_ambiguous_create_response() {
        let remote = MemoryRemote::new().with_create_response(json!({"bar": {"ID": "99"}}));
        let data = payload(json!({}));
        let request = UpsertRequest::new("/api/foo", Some("foo"), &data);

        let err = remote.upsert(&request).unwrap_err();
        assert_eq!(
            err.to_string(),
            "entity id not found in POST response for /api/foo"
        );
    }

    #[test]
    fn test_delete_absent_is_not_an_error() {
        let remote = MemoryRemote::new();
        let deleted = remote.delete("/api/foo", Some("missing"), None, None, true).unwrap();
        assert_eq!(deleted, None);
    }

    #[test]
    fn test_delete_by_name_and_by_id() {
        let remote = MemoryRemote::new();
        let data = payload(json!({}));
        remote.upsert(&UpsertRequest::new("/api/tasks", Some("a"), &data)).unwrap();
        remote.upsert(&UpsertRequest::new("/api/tasks", Some("b"), &data)).unwrap();

        let by_name = remote.delete("/api/tasks", Some("a"), None, None, true).unwrap().unwrap();
        assert_eq!(by_name.to_string(), "deleted task a [1]");

        let by_id = remote
            .delete("/api/tasks", None, None, Some(&json!("2")), true)
            .unwrap()
            .unwrap();
        assert_eq!(by_id.to_string(), "deleted task [2]");
        assert!(remote.object("/api/tasks", "2").is_none());
    }

    #[test]
    fn test_recorder_shares_buffer() {
        let recorder = Recorder::new();
        let mut handle = recorder.clone();
        handle.notify("one");
        handle.notify("two");
        assert_eq!(recorder.messages(), vec!["one", "two"]);
        assert_eq!(recorder.take(), vec!["one", "two"]);
        assert!(recorder.messages().is_empty());
    }

    #[test]
    fn test_no_prompt_fails() {
        let err = NoPrompt.ask("enter val").unwrap_err();
        assert!(err.to_string().contains("enter val"));
    }

    #[test]
    fn test_local_files_csv() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "name,value\nfoo,FOO\nbar,BAR").unwrap();

        let rows = LocalFiles.read_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(Value::Object(rows[0].clone()), json!({"name": "foo", "value": "FOO"}));
        assert_eq!(Value::Object(rows[1].clone()), json!({"name": "bar", "value": "BAR"}));
    }

    #[test]
    fn test_local_files_missing() {
        let err = LocalFiles.read_text(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
