//! # morpheus-api
//!
//! Blocking client for the Morpheus Data REST API.
//!
//! This crate provides:
//! - Path aliases (`optionTypes`, `tasks/12?max=5`) resolved to API paths
//! - Uniform error handling for failure statuses and `success: false` bodies
//! - Name lookups and prefix listings
//! - A [`deploygraph::RemoteApi`] implementation, so a [`Client`] can drive deploys
//!
//! ## Example
//!
//! ```no_run
//! use morpheus_api::{Client, ClientConfig};
//!
//! let client = Client::new(&ClientConfig::from_env().unwrap());
//!
//! let option_type = client.get("optionTypes", "region").unwrap();
//! println!("region is option type {}", option_type["id"]);
//! ```
//!
//! ## Testing
//!
//! [`MockBackend`] keeps objects in memory and follows the API's response
//! conventions closely enough to run whole deploys offline:
//!
//! ```
//! use morpheus_api::{Client, MockBackend};
//! use serde_json::json;
//!
//! let client = Client::with_backend(Box::new(MockBackend::new()));
//! client.post("tasks", json!({"task": {"name": "t1"}})).unwrap();
//! assert_eq!(client.get("tasks", "t1").unwrap()["id"], "1");
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod error;

pub use backend::{ApiRequest, ApiResponse, Backend, Method, MockBackend};
pub use config::ClientConfig;
pub use error::{Error, Result};

use backend::http::HttpBackend;
use deploygraph::paths::resolve_path;
use deploygraph::types::value_text;
use indexmap::IndexMap;
use serde_json::Value;

/// High-level API client.
///
/// Every method accepts a path alias or an absolute `/api/...` path; a query
/// string embedded in the path is merged with any explicit query pairs.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client talking HTTPS to the configured host.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            backend: Box::new(HttpBackend::new(config)),
        }
    }

    /// Create a client from `MORPHEUS_HOST` and `MORPHEUS_TOKEN`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(&ClientConfig::from_env()?))
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    // =========================================================================
    // Raw calls
    // =========================================================================

    /// Call the API and return the decoded body.
    ///
    /// Statuses other than 200 and 201, and bodies carrying `success: false`,
    /// become [`Error::Http`] with the body's `msg`, else its `errors`, else
    /// the raw body as message. An empty body decodes to `null`.
    pub fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        self.call_with_query(method, path, &[], body)
    }

    /// Like [`Client::call`], with extra query pairs.
    pub fn call_with_query(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Value> {
        let mut request = build_request(method, path);
        for (key, value) in query {
            request = request.with_query(*key, *value);
        }
        if let Some(body) = body {
            request = request.with_body(body);
        }
        self.send(&request)
    }

    /// GET a path.
    pub fn get_path(&self, path: &str) -> Result<Value> {
        self.call(Method::Get, path, None)
    }

    /// GET a path and narrow the response with a JMESPath query.
    ///
    /// A query that evaluates to null is [`Error::NullTransform`].
    pub fn search(&self, path: &str, query: &str) -> Result<Value> {
        transform(query, &self.get_path(path)?)
    }

    /// GET a path and unwrap the payload with [`entity_of`].
    pub fn get_entity(&self, path: &str) -> Result<Value> {
        self.get_path(path).map(entity_of)
    }

    /// POST a JSON body.
    pub fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.call(Method::Post, path, Some(body))
    }

    /// PUT a JSON body.
    pub fn put(&self, path: &str, body: Value) -> Result<Value> {
        self.call(Method::Put, path, Some(body))
    }

    /// DELETE a path.
    pub fn delete_path(&self, path: &str) -> Result<Value> {
        self.call(Method::Delete, path, None)
    }

    fn send(&self, request: &ApiRequest) -> Result<Value> {
        let response = self.backend.send(request)?;

        let parsed: Option<Value> = if response.body.trim().is_empty() {
            Some(Value::Null)
        } else {
            serde_json::from_str(&response.body).ok()
        };
        let success = parsed
            .as_ref()
            .and_then(|v| v.get("success"))
            .and_then(Value::as_bool);

        if !matches!(response.status, 200 | 201) || success == Some(false) {
            let message = parsed
                .as_ref()
                .and_then(|v| v.get("msg").or_else(|| v.get("errors")))
                .map_or_else(|| response.body.clone(), value_text);
            return Err(Error::http(response.status, message));
        }

        parsed.ok_or_else(|| Error::InvalidResponse(format!("{request}: body is not JSON")))
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// First object named `name`, `None` when there is none.
    pub fn find(&self, path: &str, name: &str) -> Result<Option<Value>> {
        let response = self.call_with_query(Method::Get, path, &[("name", name)], None)?;
        match entity_of(response) {
            Value::Array(items) => Ok(items.into_iter().next()),
            _ => Ok(None),
        }
    }

    /// Object named `name`; a missing object is `HTTP [404] not found`.
    pub fn get(&self, path: &str, name: &str) -> Result<Value> {
        self.find(path, name)?
            .ok_or_else(|| Error::http(404, "not found"))
    }

    /// Id of the object named `name`, if one exists.
    pub fn get_id(&self, path: &str, name: &str) -> Result<Option<Value>> {
        Ok(self
            .find(path, name)?
            .and_then(|object| object.get("id").filter(|id| !id.is_null()).cloned()))
    }

    /// Name to id of the objects whose name starts with `prefix`.
    ///
    /// The API's `phrase` search is a substring match, so results are
    /// filtered again here. Objects without a string name are skipped.
    pub fn name_ids(&self, path: &str, prefix: &str) -> Result<IndexMap<String, Value>> {
        let response = self.call_with_query(Method::Get, path, &[("phrase", prefix)], None)?;
        let Value::Array(items) = entity_of(response) else {
            return Ok(IndexMap::new());
        };

        Ok(items
            .into_iter()
            .filter_map(|item| {
                let name = item.get("name")?.as_str()?.to_string();
                let id = item.get("id").cloned().unwrap_or(Value::Null);
                name.starts_with(prefix).then_some((name, id))
            })
            .collect())
    }
}

/// The payload of a response: the value under its first key other than `meta`.
///
/// Anything other than a mapping, or a mapping with only `meta`, is returned
/// unchanged.
#[must_use]
pub fn entity_of(response: Value) -> Value {
    match response {
        Value::Object(mut map) => match map.keys().find(|k| *k != "meta").cloned() {
            Some(key) => map.shift_remove(&key).unwrap_or(Value::Null),
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Apply a JMESPath query to a response.
///
/// ```
/// use serde_json::json;
///
/// let response = json!({"optionTypes": [{"name": "a"}, {"name": "b"}]});
/// let names = morpheus_api::transform("optionTypes[].name", &response).unwrap();
/// assert_eq!(names, json!(["a", "b"]));
/// ```
pub fn transform(query: &str, response: &Value) -> Result<Value> {
    let expression = jmespath::compile(query).map_err(|e| Error::Query(e.to_string()))?;
    let result = expression
        .search(response)
        .map_err(|e| Error::Query(e.to_string()))?;
    if result.is_null() {
        return Err(Error::NullTransform);
    }
    Ok(serde_json::to_value(&*result)?)
}

/// Split an embedded query string off `path` and resolve the alias.
///
/// Pairs are percent-decoded here; the backend encodes them again.
fn build_request(method: Method, path: &str) -> ApiRequest {
    let (path, query) = path.split_once('?').unwrap_or((path, ""));
    let mut request = ApiRequest::new(method, resolve_path(path));
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        request = request.with_query(key.into_owned(), value.into_owned());
    }
    request
}

impl deploygraph::RemoteApi for Client {
    fn lookup_by_name(&self, path: &str, name: &str) -> deploygraph::Result<Option<Value>> {
        Ok(self.find(path, name)?)
    }

    fn create(&self, path: &str, body: &Value) -> deploygraph::Result<Value> {
        Ok(self.post(path, body.clone())?)
    }

    fn update(&self, path: &str, id: &Value, body: &Value) -> deploygraph::Result<Value> {
        Ok(self.put(&format!("{path}/{}", value_text(id)), body.clone())?)
    }

    fn delete_by_id(&self, path: &str, id: &Value, force: bool) -> deploygraph::Result<()> {
        let query: &[(&str, &str)] = if force { &[("force", "true")] } else { &[] };
        self.call_with_query(Method::Delete, &format!("{path}/{}", value_text(id)), query, None)?;
        Ok(())
    }

    fn list_by_name_prefix(&self, path: &str, prefix: &str) -> deploygraph::Result<IndexMap<String, Value>> {
        Ok(self.name_ids(path, prefix)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploygraph::{RemoteApiExt, UpsertRequest};
    use serde_json::json;

    struct Canned(u16, &'static str);

    impl Backend for Canned {
        fn send(&self, _request: &ApiRequest) -> Result<ApiResponse> {
            Ok(ApiResponse {
                status: self.0,
                body: self.1.to_string(),
            })
        }
    }

    fn mock_client() -> (Client, MockBackend) {
        let mock = MockBackend::new();
        (Client::with_backend(Box::new(mock.clone())), mock)
    }

    #[test]
    fn test_build_request_splits_query() {
        let request = build_request(Method::Get, "optionTypes?max=5&phrase=a");
        assert_eq!(request.path, "/api/library/option-types");
        assert_eq!(
            request.query,
            vec![("max".to_string(), "5".to_string()), ("phrase".to_string(), "a".to_string())]
        );
    }

    #[test]
    fn test_build_request_decodes_query() {
        let request = build_request(Method::Get, "tasks?name=a%20b&phrase=x+y");
        assert_eq!(
            request.query,
            vec![("name".to_string(), "a b".to_string()), ("phrase".to_string(), "x y".to_string())]
        );
    }

    #[test]
    fn test_search_applies_query() {
        let (client, _) = mock_client();
        for name in ["foo1", "foo2"] {
            client.post("optionTypes", json!({"optionType": {"name": name}})).unwrap();
        }

        let names = client.search("optionTypes", "optionTypes[].name").unwrap();
        assert_eq!(names, json!(["foo1", "foo2"]));
    }

    #[test]
    fn test_search_null_result_is_an_error() {
        let (client, _) = mock_client();
        client.post("tasks", json!({"task": {"name": "t1"}})).unwrap();

        let err = client.search("tasks", "baz").unwrap_err();
        assert!(matches!(err, Error::NullTransform));
        assert_eq!(err.to_string(), "null response from transform");

        assert!(matches!(transform("tasks[", &json!({})), Err(Error::Query(_))));
    }

    #[test]
    fn test_error_message_sources() {
        let client = Client::with_backend(Box::new(Canned(400, r#"{"msg": "bad name"}"#)));
        assert_eq!(client.get_path("tasks").unwrap_err().to_string(), "HTTP [400] bad name");

        let client = Client::with_backend(Box::new(Canned(400, r#"{"errors": {"name": "taken"}}"#)));
        assert_eq!(
            client.get_path("tasks").unwrap_err().to_string(),
            r#"HTTP [400] {"name":"taken"}"#
        );

        let client = Client::with_backend(Box::new(Canned(502, "bad gateway")));
        assert_eq!(client.get_path("tasks").unwrap_err().to_string(), "HTTP [502] bad gateway");
    }

    #[test]
    fn test_success_false_is_an_error() {
        let client = Client::with_backend(Box::new(Canned(200, r#"{"success": false, "msg": "locked"}"#)));
        let err = client.post("tasks", json!({})).unwrap_err();
        assert_eq!(err.status(), Some(200));
        assert_eq!(err.to_string(), "HTTP [200] locked");
    }

    #[test]
    fn test_empty_and_invalid_bodies() {
        let client = Client::with_backend(Box::new(Canned(200, "")));
        assert_eq!(client.delete_path("tasks/1").unwrap(), Value::Null);

        let client = Client::with_backend(Box::new(Canned(200, "<html>")));
        assert!(matches!(client.get_path("tasks"), Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_entity_of_skips_meta() {
        assert_eq!(entity_of(json!({"meta": {"total": 1}, "tasks": [1]})), json!([1]));
        assert_eq!(entity_of(json!({"meta": {}})), json!({"meta": {}}));
        assert_eq!(entity_of(json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn test_get_and_find() {
        let (client, mock) = mock_client();
        client.post("tasks", json!({"task": {"name": "t1"}})).unwrap();

        assert_eq!(client.get("tasks", "t1").unwrap(), json!({"name": "t1", "id": "1"}));
        assert_eq!(client.get_id("tasks", "t1").unwrap(), Some(json!("1")));
        assert_eq!(client.find("tasks", "t2").unwrap(), None);

        let err = client.get("tasks", "t2").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "HTTP [404] not found");

        assert_eq!(mock.requests()[1], "GET /api/tasks?name=t1");
    }

    #[test]
    fn test_name_ids_filters_prefix() {
        let (client, mock) = mock_client();
        for name in ["app-a", "app-b", "web-app"] {
            client.post("tasks", json!({"task": {"name": name}})).unwrap();
        }

        let ids = client.name_ids("tasks", "app-").unwrap();
        assert_eq!(ids.keys().collect::<Vec<_>>(), vec!["app-a", "app-b"]);
        assert_eq!(ids["app-b"], json!("2"));
        assert!(mock.requests().contains(&"GET /api/tasks?phrase=app-".to_string()));
    }

    #[test]
    fn test_server_error() {
        let (client, _) = mock_client();
        let err = client.get_path("/api/servererror").unwrap_err();
        assert_eq!(err.to_string(), "HTTP [500] internal server error");
    }

    #[test]
    fn test_remote_api_upsert_and_force_delete() {
        let (client, mock) = mock_client();
        let payload = json!({"type": "checkbox"});
        let payload = payload.as_object().unwrap();

        let created = client.upsert(&UpsertRequest::new("optionTypes", Some("foo"), payload)).unwrap();
        assert_eq!(created.to_string(), "created optionType foo [1]");

        let updated = client.upsert(&UpsertRequest::new("optionTypes", Some("foo"), payload)).unwrap();
        assert_eq!(updated.to_string(), "updated optionType foo [1]");

        let deleted = client
            .delete("optionTypes", Some("foo"), None, None, true)
            .unwrap()
            .unwrap();
        assert_eq!(deleted.to_string(), "deleted optionType foo [1]");

        let requests = mock.requests();
        assert!(requests.contains(&"PUT /api/library/option-types/1".to_string()));
        assert_eq!(
            requests.last().map(String::as_str),
            Some("DELETE /api/library/option-types/1?force=true")
        );
        assert!(mock.objects("/api/library/option-types").is_empty());
    }

    #[test]
    fn test_remote_errors_convert() {
        let (client, _) = mock_client();
        let err = deploygraph::RemoteApi::delete_by_id(&client, "tasks", &json!(9), false).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "HTTP [404] not found");
    }
}
