//! Transport backends.
//!
//! [`Backend`] sends one request and returns the raw response. Status
//! handling and body interpretation live in [`crate::Client`], so every
//! backend behaves the same from the client's point of view.
//!
//! # Testing
//!
//! Use [`MockBackend`] to run against an in-memory API:
//!
//! ```
//! use morpheus_api::backend::{ApiRequest, Backend, Method, MockBackend};
//! use serde_json::json;
//!
//! let mock = MockBackend::new();
//! let request = ApiRequest::new(Method::Post, "/api/tasks").with_body(json!({"task": {"name": "t1"}}));
//! let response = mock.send(&request).unwrap();
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body, r#"{"id":"1"}"#);
//! ```

pub mod http;

use crate::error::Result;
use deploygraph::paths::resolve_entity_name;
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::{Arc, Mutex};

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// One API request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Canonical path, e.g. `/api/library/option-types/3`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

impl ApiRequest {
    /// Path with its query string, e.g. `/api/tasks?name=a`.
    pub fn target(&self) -> String {
        let mut target = self.path.clone();
        for (i, (k, v)) in self.query.iter().enumerate() {
            target.push(if i == 0 { '?' } else { '&' });
            target.push_str(&format!("{k}={v}"));
        }
        target
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.target())
    }
}

/// Raw API response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    /// Body text, usually JSON
    pub body: String,
}

impl ApiResponse {
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

/// Sends requests to the API.
pub trait Backend: Send + Sync {
    /// Send a request. Failure statuses are responses, not errors.
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// Entities whose create response nests the id: `{success, <entity>: {id}}`.
const NESTED_CREATE_ENTITIES: &[&str] = &["job", "blueprint", "cypher"];

#[derive(Debug, Default)]
struct Collection {
    counter: u64,
    /// Singular entity name, taken from the first create body
    entity: String,
    objects: IndexMap<String, Value>,
}

#[derive(Debug, Default)]
struct MockState {
    collections: IndexMap<String, Collection>,
    requests: Vec<String>,
}

/// In-memory API for testing without network access.
///
/// Objects are stored per collection path with string ids counting from
/// `1`. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far, e.g. `POST /api/tasks`.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().map(|s| s.requests.clone()).unwrap_or_default()
    }

    /// Objects stored under a collection path, in creation order.
    pub fn objects(&self, path: &str) -> Vec<Value> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.collections.get(path).map(|c| c.objects.values().cloned().collect()))
            .unwrap_or_default()
    }

    fn handle(state: &mut MockState, request: &ApiRequest) -> ApiResponse {
        if request.path == "/api/servererror" {
            return ApiResponse {
                status: 500,
                body: "internal server error".to_string(),
            };
        }

        let (mut collection_path, object_id) = split_object_path(&request.path);
        let body = request.body.clone().unwrap_or(Value::Null);

        match (request.method, object_id) {
            (method, Some(id)) => {
                let exists = state
                    .collections
                    .get(&collection_path)
                    .is_some_and(|c| c.objects.contains_key(&id));
                match method {
                    // PUT to an unknown id stores it under that id
                    Method::Put => {
                        let id = upsert(state, &collection_path, Some(id), &body);
                        ApiResponse::json(200, &json!({ "id": id }))
                    }
                    _ if !exists => not_found(),
                    Method::Get => {
                        let collection = &state.collections[&collection_path];
                        ApiResponse::json(200, &json!({ (collection.entity.clone()): collection.objects[&id] }))
                    }
                    Method::Delete => {
                        if let Some(collection) = state.collections.get_mut(&collection_path) {
                            collection.objects.shift_remove(&id);
                        }
                        ApiResponse::json(200, &Value::Null)
                    }
                    Method::Post => bad_request(),
                }
            }
            (Method::Post, None) => {
                // /api/library/<parent>/<id>/<child> lands in /api/library/<child>
                let parts: Vec<&str> = request.path.split('/').collect();
                if parts.len() == 6 {
                    collection_path = [parts[0], parts[1], parts[2], parts[5]].join("/");
                }
                let id = upsert(state, &collection_path, None, &body);
                let entity = state.collections[&collection_path].entity.clone();
                let response = if NESTED_CREATE_ENTITIES.contains(&entity.as_str()) {
                    json!({ "success": true, (entity): { "id": id } })
                } else {
                    json!({ "id": id })
                };
                ApiResponse::json(200, &response)
            }
            (Method::Get, None) => {
                let name = request.query_value("name");
                let (key, items): (String, Vec<Value>) = match state.collections.get(&collection_path) {
                    Some(collection) => (
                        format!("{}s", collection.entity),
                        collection
                            .objects
                            .values()
                            .filter(|o| name.is_none_or(|n| o.get("name").and_then(Value::as_str) == Some(n)))
                            .cloned()
                            .collect(),
                    ),
                    None => (resolve_entity_name(&request.path, None, false), Vec::new()),
                };
                ApiResponse::json(200, &json!({ (key): items }))
            }
            _ => bad_request(),
        }
    }
}

impl Backend for MockBackend {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| crate::Error::Transport(format!("mock state poisoned: {e}")))?;
        state.requests.push(request.to_string());
        let response = Self::handle(&mut state, request);
        log::trace!("MOCK {request} -> {} {}", response.status, response.body);
        Ok(response)
    }
}

/// Split `/api/x/12` into the collection path and object id.
///
/// Ids are numeric, except under `/api/cypher` where everything after the
/// collection is the id (`/api/cypher/secret/app/key`).
fn split_object_path(path: &str) -> (String, Option<String>) {
    let parts: Vec<&str> = path.split('/').collect();
    if path.starts_with("/api/cypher") && parts.len() > 3 {
        return (parts[..3].join("/"), Some(parts[3..].join("/")));
    }
    match parts.split_last() {
        Some((last, rest)) if !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()) => {
            (rest.join("/"), Some((*last).to_string()))
        }
        _ => (path.to_string(), None),
    }
}

/// Store the wrapped object of `body`, returning its id.
fn upsert(state: &mut MockState, collection_path: &str, id: Option<String>, body: &Value) -> String {
    let (entity, object) = match body.as_object().and_then(|b| b.iter().next()) {
        Some((entity, object)) => (entity.clone(), object.as_object().cloned().unwrap_or_default()),
        None => (resolve_entity_name(collection_path, None, true), Map::new()),
    };

    let collection = state
        .collections
        .entry(collection_path.to_string())
        .or_insert_with(|| Collection {
            entity: entity.clone(),
            ..Collection::default()
        });
    let id = id.unwrap_or_else(|| {
        collection.counter += 1;
        collection.counter.to_string()
    });

    let mut object = object;
    object.insert("id".to_string(), Value::String(id.clone()));
    collection.objects.insert(id.clone(), Value::Object(object));
    id
}

fn not_found() -> ApiResponse {
    ApiResponse::json(404, &json!({"msg": "not found"}))
}

fn bad_request() -> ApiResponse {
    ApiResponse::json(400, &json!({"msg": "bad request"}))
}
