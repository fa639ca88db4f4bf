//! In-memory remote used by unit tests

use crate::context::RemoteApi;
use crate::error::{Error, Result};
use crate::paths::resolve_path;
use crate::types::value_text;
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::cell::{Cell, RefCell};

/// Collections keyed by canonical path, objects keyed by string id
#[derive(Default)]
pub struct MemoryRemote {
    store: RefCell<IndexMap<String, IndexMap<String, Value>>>,
    counters: RefCell<IndexMap<String, u64>>,
    calls: RefCell<Vec<String>>,
    bodies: RefCell<Vec<Value>>,
    lookups: Cell<usize>,
    create_response: Option<Value>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every create with `response` instead of the stored object.
    pub fn with_create_response(mut self, response: Value) -> Self {
        self.create_response = Some(response);
        self
    }

    /// Insert an object directly. It must carry an `id`.
    pub fn seed(&self, path: &str, object: Value) {
        let id = value_text(&object["id"]);
        self.store
            .borrow_mut()
            .entry(resolve_path(path))
            .or_default()
            .insert(id, object);
    }

    pub fn object(&self, path: &str, id: &str) -> Option<Value> {
        self.store.borrow().get(&resolve_path(path))?.get(id).cloned()
    }

    pub fn names(&self, path: &str) -> Vec<String> {
        self.store
            .borrow()
            .get(&resolve_path(path))
            .map(|c| c.values().map(|o| value_text(&o["name"])).collect())
            .unwrap_or_default()
    }

    /// Mutating calls in order, e.g. `POST /api/tasks`, `DELETE /api/tasks/1`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Bodies sent by create and update, in order.
    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.borrow().clone()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }

    fn next_id(&self, path: &str) -> String {
        let mut counters = self.counters.borrow_mut();
        let counter = counters.entry(path.to_string()).or_default();
        *counter += 1;
        counter.to_string()
    }
}

/// The wrapped object of a `{entity: {...}}` body.
fn unwrap_body(body: &Value) -> Map<String, Value> {
    body.as_object()
        .and_then(|b| b.values().next())
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

impl RemoteApi for MemoryRemote {
    fn lookup_by_name(&self, path: &str, name: &str) -> Result<Option<Value>> {
        self.lookups.set(self.lookups.get() + 1);
        Ok(self.store.borrow().get(&resolve_path(path)).and_then(|c| {
            c.values()
                .find(|o| o.get("name").and_then(Value::as_str) == Some(name))
                .cloned()
        }))
    }

    fn create(&self, path: &str, body: &Value) -> Result<Value> {
        let path = resolve_path(path);
        self.calls.borrow_mut().push(format!("POST {path}"));
        self.bodies.borrow_mut().push(body.clone());
        let id = self.next_id(&path);
        let mut object = unwrap_body(body);
        object.insert("id".to_string(), Value::String(id.clone()));
        let object = Value::Object(object);
        self.store
            .borrow_mut()
            .entry(path)
            .or_default()
            .insert(id, object.clone());
        Ok(self
            .create_response
            .clone()
            .unwrap_or_else(|| json!({ "entity": object })))
    }

    fn update(&self, path: &str, id: &Value, body: &Value) -> Result<Value> {
        let path = resolve_path(path);
        let id = value_text(id);
        self.calls.borrow_mut().push(format!("PUT {path}/{id}"));
        self.bodies.borrow_mut().push(body.clone());
        let mut store = self.store.borrow_mut();
        let Some(existing) = store.get_mut(&path).and_then(|c| c.get_mut(&id)) else {
            return Err(Error::remote(Some(404), "not found"));
        };
        let mut object = unwrap_body(body);
        object.insert("id".to_string(), Value::String(id));
        *existing = Value::Object(object);
        Ok(json!({ "success": true }))
    }

    fn delete_by_id(&self, path: &str, id: &Value, _force: bool) -> Result<()> {
        let path = resolve_path(path);
        let id = value_text(id);
        self.calls.borrow_mut().push(format!("DELETE {path}/{id}"));
        self.store
            .borrow_mut()
            .get_mut(&path)
            .and_then(|c| c.shift_remove(&id))
            .map(|_| ())
            .ok_or_else(|| Error::remote(Some(404), "not found"))
    }

    fn list_by_name_prefix(&self, path: &str, prefix: &str) -> Result<IndexMap<String, Value>> {
        Ok(self
            .store
            .borrow()
            .get(&resolve_path(path))
            .map(|c| {
                c.values()
                    .filter_map(|o| {
                        let name = o.get("name")?.as_str()?;
                        name.starts_with(prefix).then(|| (name.to_string(), o["id"].clone()))
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
