//! Deploy, undeploy and plan commands.

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use deploygraph::{ExtractOptions, LocalFiles, Operation, Pass, collect_documents, extract, load_document};
use std::path::{Path, PathBuf};

use crate::Context;
use crate::ui::{self, ConsoleNotifier, TerminalPrompter};

/// Run one deploy or undeploy pass over files and directories.
pub fn run(ctx: &Context, paths: &[PathBuf], pass: Pass) -> Result<()> {
    let client = ctx.client()?;
    let mut deployer = deploygraph::Deployer::new(&client)
        .with_notifier(ConsoleNotifier::new(ctx.quiet))
        .with_prompter(TerminalPrompter);

    let results = deployer.deploy_many(paths, pass)?;
    log::debug!("{} {} object(s)", pass.verb(), results.len());

    if results.is_empty() && collect_documents(paths).is_empty() {
        ui::warn("no .yaml or .yml documents found");
    }
    Ok(())
}

/// Print the operations of each document in execution order.
pub fn plan(ctx: &Context, paths: &[PathBuf], undeploy: bool) -> Result<()> {
    let pass = Pass::from_undeploy(undeploy);
    let documents = collect_documents(paths);
    if documents.is_empty() {
        ui::warn("no .yaml or .yml documents found");
        return Ok(());
    }

    let mut total = 0;
    for path in &documents {
        let operations = plan_document(path, pass)?;
        total += operations.len();

        let file_name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        ui::header(&file_name);
        for (i, op) in operations.iter().enumerate() {
            println!("  {} {}", format!("{:>3}.", i + 1).dimmed(), op.describe(pass));
        }
    }

    if !ctx.quiet {
        println!();
        ui::success(&format!("{total} operation(s) in {} file(s)", documents.len()));
    }
    Ok(())
}

/// Extract one document's operations in the order a pass would run them.
fn plan_document(path: &Path, pass: Pass) -> Result<Vec<Operation>> {
    let document = load_document(path)?;
    let mut options = ExtractOptions::new().reverse(pass.is_undeploy());
    if let Some(dir) = path.parent() {
        options = options.config_dir(dir);
    }

    let mut operations = extract(document, &options, &mut TerminalPrompter, &LocalFiles)
        .with_context(|| format!("Could not plan {}", path.display()))?;
    if pass.is_undeploy() {
        operations.reverse();
    }
    Ok(operations)
}
