//! Read-only API commands: `get` and `export`.

use anyhow::{Context as AnyhowContext, Result};
use deploygraph::paths::{resolve_entity_name, resolve_path};
use serde_json::{Map, Value};

use crate::Context;
use crate::cli::{ExportArgs, GetArgs};

/// Print the response to a GET, optionally narrowed by a JMESPath query.
pub fn get(ctx: &Context, args: &GetArgs) -> Result<()> {
    let client = ctx.client()?;
    let value = match &args.query {
        Some(query) => client.search(&args.path, query)?,
        None => client.get_path(&args.path)?,
    };

    print!("{}", render(&value, args.yaml)?);
    Ok(())
}

/// Print an object as a document `deploy` accepts.
pub fn export(ctx: &Context, args: &ExportArgs) -> Result<()> {
    let name = args.name.as_deref().context("--name required")?;
    let client = ctx.client()?;
    let object = client.get(&args.path, name)?;

    print!("{}", render(&export_document(&args.path, object), true)?);
    Ok(())
}

/// Wrap an object under its `$<singularEntity>` declaration key.
fn export_document(path: &str, object: Value) -> Value {
    let entity = resolve_entity_name(&resolve_path(path), None, true);
    let mut document = Map::new();
    document.insert(format!("${entity}"), object);
    Value::Object(document)
}

fn render(value: &Value, yaml: bool) -> Result<String> {
    if yaml {
        Ok(serde_yaml::to_string(value)?)
    } else {
        Ok(format!("{}\n", serde_json::to_string_pretty(value)?))
    }
}
