//! Execution engine - runs extracted operations against the remote API

use crate::context::{Notifier, RemoteApi, RemoteApiExt, UpsertRequest};
use crate::error::{Error, Result};
use crate::expand::{ExpandCache, expand, expand_text};
use crate::types::{Applied, Operation, OperationKind, Pass, PathNames, path_name};
use serde_json::Value;

/// Execute operations in order and collect `<path>:<name-or-id>` → id.
///
/// Undeploy passes run the list back to front. Tokens are expanded just
/// before each operation runs, using `cache` for the whole pass. The first
/// failure aborts the pass; effects already applied stay applied.
///
/// # Arguments
/// * `operations` - Operations in extraction order
/// * `pass` - Deploy (upsert) or undeploy (delete)
/// * `remote` - Remote API the calls go to
/// * `notifier` - Receives one notice per remote effect
/// * `cache` - Token resolutions shared by the pass
pub fn execute<R, N>(
    mut operations: Vec<Operation>,
    pass: Pass,
    remote: &R,
    notifier: &mut N,
    cache: &mut ExpandCache,
) -> Result<PathNames>
where
    R: RemoteApi + ?Sized,
    N: Notifier + ?Sized,
{
    if pass.is_undeploy() {
        operations.reverse();
    }
    log::debug!("executing {} operation(s)", operations.len());

    let mut results = PathNames::new();
    // `name` labels the result entry; the notice shows what the delete call knew
    let mut report = |results: &mut PathNames, path: &str, name: Option<&str>, applied: Applied| {
        notifier.notify(&applied.to_string());
        results.insert(path_name(path, name, &applied.id), applied.id);
    };

    for op in operations {
        let op = expand_operation(op, pass, remote, cache)?;
        log::debug!("{op}");

        match (op.kind, pass) {
            (OperationKind::DeleteIds, _) => {
                if let Some(prefix) = op.wildcard_prefix() {
                    for (name, id) in remote.list_by_name_prefix(&op.path, prefix)? {
                        if let Some(applied) =
                            remote.delete(op.delete_target(), None, op.entity.as_deref(), Some(&id), true)?
                        {
                            report(&mut results, &op.path, Some(&name), applied);
                        }
                    }
                } else if let Some(applied) = remote.delete(
                    op.delete_target(),
                    op.name.as_deref(),
                    op.entity.as_deref(),
                    op.existing_id(),
                    true,
                )? {
                    report(&mut results, &op.path, op.name.as_deref(), applied);
                }
            }
            (OperationKind::Declare, Pass::Undeploy) => {
                if let Some(applied) = remote.delete(
                    op.delete_target(),
                    op.name.as_deref(),
                    op.entity.as_deref(),
                    op.existing_id(),
                    true,
                )? {
                    report(&mut results, &op.path, op.name.as_deref(), applied);
                }
            }
            (OperationKind::Declare, Pass::Deploy) => {
                let request = UpsertRequest {
                    entity: op.entity.as_deref(),
                    id: op.existing_id(),
                    set_name: op.set_name,
                    create_path: op.create_path.as_deref(),
                    update_path: op.update_path.as_deref(),
                    ..UpsertRequest::new(&op.path, op.name.as_deref(), &op.payload)
                };
                let applied = remote.upsert(&request)?;
                report(&mut results, &op.path, op.name.as_deref(), applied);
            }
        }
    }

    Ok(results)
}

/// Expand the tokens an operation carries.
///
/// Addressing fields are always expanded. The payload is expanded only on
/// deploy: on undeploy it is never sent, and the objects it references may
/// already be gone.
fn expand_operation<R: RemoteApi + ?Sized>(
    mut op: Operation,
    pass: Pass,
    remote: &R,
    cache: &mut ExpandCache,
) -> Result<Operation> {
    if let Some(path) = expand_text(Some(&op.path), remote, cache)? {
        op.path = path;
    }
    op.name = expand_text(op.name.as_deref(), remote, cache)?;
    op.entity = expand_text(op.entity.as_deref(), remote, cache)?;
    op.create_path = expand_text(op.create_path.as_deref(), remote, cache)?;
    op.update_path = expand_text(op.update_path.as_deref(), remote, cache)?;
    op.delete_path = expand_text(op.delete_path.as_deref(), remote, cache)?;
    op.id = op.id.map(|id| expand(&id, remote, cache)).transpose()?;
    op.entity_id = op.entity_id.map(|id| expand(&id, remote, cache)).transpose()?;

    if !pass.is_undeploy() {
        op.payload = match expand(&Value::Object(op.payload), remote, cache)? {
            Value::Object(payload) => payload,
            other => {
                return Err(Error::config(format!("payload expanded to a non-mapping value: {other}")));
            }
        };
    }
    Ok(op)
}
