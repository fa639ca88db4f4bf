//! Core types for deploy passes

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::paths::resolve_path;

/// Ordered `<canonicalPath>:<name-or-id>` → id results of a pass.
pub type PathNames = IndexMap<String, Value>;

/// What an operation does at execution time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    /// Resource declaration: upsert on deploy, delete on undeploy
    Declare,
    /// `$deleteIds` entry: always a forced delete
    DeleteIds,
}

/// One extracted unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    /// Canonical collection path
    pub path: String,
    /// Object name (a trailing `*` on a delete-ids name means prefix match)
    pub name: Option<String>,
    /// `id` carried by the payload itself
    pub id: Option<Value>,
    /// Resource-type override (`$entity`)
    pub entity: Option<String>,
    /// Existing-id override (`$entityId`)
    pub entity_id: Option<Value>,
    /// Inject `name` into the wrapped payload (`$setName`)
    pub set_name: bool,
    pub create_path: Option<String>,
    pub update_path: Option<String>,
    pub delete_path: Option<String>,
    pub payload: Map<String, Value>,
}

impl Operation {
    /// Create a declaration operation with default metadata.
    pub fn declare(path: impl Into<String>, payload: Map<String, Value>) -> Self {
        let name = payload.get("name").filter(|v| !v.is_null()).map(value_text);
        let id = payload.get("id").filter(|v| !v.is_null()).cloned();
        Self {
            kind: OperationKind::Declare,
            path: path.into(),
            name,
            id,
            entity: None,
            entity_id: None,
            set_name: true,
            create_path: None,
            update_path: None,
            delete_path: None,
            payload,
        }
    }

    /// Create a delete-ids operation for one `path:name` entry.
    pub fn delete_ids(path: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut payload = Map::new();
        payload.insert("name".to_string(), Value::String(name.clone()));
        Self {
            kind: OperationKind::DeleteIds,
            path: path.into(),
            name: Some(name),
            id: None,
            entity: None,
            entity_id: None,
            set_name: true,
            create_path: None,
            update_path: None,
            delete_path: None,
            payload,
        }
    }

    /// Prefix to match when this is a wildcard delete (`name*`).
    pub fn wildcard_prefix(&self) -> Option<&str> {
        match self.kind {
            OperationKind::DeleteIds => self.name.as_deref().and_then(|n| n.strip_suffix('*')),
            OperationKind::Declare => None,
        }
    }

    /// Explicit id to act on, if any: `$entityId` first, then the payload id.
    pub fn existing_id(&self) -> Option<&Value> {
        self.entity_id.as_ref().or(self.id.as_ref())
    }

    /// Path deletes are sent to.
    pub fn delete_target(&self) -> &str {
        self.delete_path.as_deref().unwrap_or(&self.path)
    }
}

impl Operation {
    /// One-line summary of what `pass` does with this operation.
    pub fn describe(&self, pass: Pass) -> String {
        let verb = match (self.kind, pass) {
            (OperationKind::Declare, Pass::Deploy) => "upsert",
            (OperationKind::Declare, Pass::Undeploy) => "delete",
            (OperationKind::DeleteIds, _) => "delete-ids",
        };
        let target = match (&self.name, self.existing_id()) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("[{}]", value_text(id)),
            (None, None) => "-".to_string(),
        };
        format!("{verb} {} {target}", self.path)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(Pass::Deploy))
    }
}

/// Action a remote call performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// Outcome of one upsert or delete
///
/// Displays as the progress notice, e.g. `created optionType foo [1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applied {
    pub action: Action,
    /// Singular resource-type name
    pub entity: String,
    pub name: Option<String>,
    pub id: Value,
}

impl fmt::Display for Applied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.entity)?;
        if let Some(name) = &self.name {
            write!(f, " {name}")?;
        }
        write!(f, " [{}]", value_text(&self.id))
    }
}

/// Direction of a deploy pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Pass {
    #[default]
    Deploy,
    Undeploy,
}

impl Pass {
    pub fn from_undeploy(undeploy: bool) -> Self {
        if undeploy { Self::Undeploy } else { Self::Deploy }
    }

    pub fn is_undeploy(self) -> bool {
        matches!(self, Self::Undeploy)
    }

    /// Past-tense verb used in file progress notices.
    pub fn verb(self) -> &'static str {
        match self {
            Self::Deploy => "deployed",
            Self::Undeploy => "undeployed",
        }
    }
}

/// Render a scalar id the way it appears in paths and messages.
///
/// Strings are used verbatim, everything else in its JSON form.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Result-map key for an object.
pub fn path_name(path: &str, name: Option<&str>, id: &Value) -> String {
    let label = name.map_or_else(|| value_text(id), str::to_string);
    format!("{}:{label}", resolve_path(path))
}
