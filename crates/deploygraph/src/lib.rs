//! # Deploygraph
//!
//! Declarative deployment engine for a REST management API.
//!
//! A configuration document describes remote objects as nested `$<alias>`
//! declarations. The engine turns it into an ordered list of operations,
//! rewrites nested declarations into `${id:path:name}` references, and
//! runs the operations with upsert semantics, resolving each reference
//! right before the object that needs it is sent.
//!
//! ## Core Concepts
//!
//! - **Planner**: walks the document and extracts [`Operation`]s, children first
//! - **Expander**: resolves `${id:..}` tokens through a pass-scoped [`ExpandCache`]
//! - **Executor**: runs operations forward (deploy) or backward (undeploy)
//! - **Deployer**: ties the above to a [`RemoteApi`] and the caller's collaborators
//!
//! ## Example
//!
//! ```ignore
//! use deploygraph::{Deployer, Pass, Recorder};
//! use serde_json::json;
//!
//! let recorder = Recorder::new();
//! let mut deployer = Deployer::new(&client).with_notifier(recorder.clone());
//!
//! let document = json!({
//!     "$optionTypes": {
//!         "name": "size",
//!         "type": "select",
//!         "fieldName": "size",
//!         "fieldLabel": "Size",
//!         "optionList": {"id": {"$optionTypeLists": {"name": "sizes", "type": "manual"}}}
//!     }
//! });
//!
//! let ids = deployer.deploy_document(document, Pass::Deploy, None)?;
//! println!("{:?}", recorder.messages());
//! ```

pub mod context;
pub mod deploy;
pub mod directive;
pub mod encode;
pub mod error;
pub mod executor;
pub mod expand;
pub mod loader;
pub mod paths;
pub mod planner;
pub mod types;

#[cfg(test)]
mod test_support;

pub use context::{
    FileSource, LocalFiles, NoPrompt, Notifier, Prompter, Recorder, RemoteApi, RemoteApiExt, Silent,
    UpsertRequest,
};
pub use deploy::Deployer;
pub use directive::{Directive, MetadataKey};
pub use error::{Error, Result};
pub use executor::execute;
pub use expand::{ExpandCache, expand};
pub use loader::{collect_documents, load_document};
pub use planner::{ExtractOptions, extract};
pub use types::{Action, Applied, Operation, OperationKind, Pass, PathNames};
