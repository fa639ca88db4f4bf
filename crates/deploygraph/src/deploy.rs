//! Deploy passes over documents and files

use crate::context::{FileSource, LocalFiles, NoPrompt, Notifier, Prompter, RemoteApi, Silent};
use crate::error::Result;
use crate::executor::execute;
use crate::expand::ExpandCache;
use crate::loader::{collect_documents, parse_document};
use crate::planner::{ExtractOptions, extract};
use crate::types::{Operation, Pass, PathNames};
use serde_json::Value;
use std::path::Path;

/// Runs deploy and undeploy passes against a remote API
///
/// Defaults to no notices, no operator and the local filesystem; swap
/// them with the `with_*` builders.
pub struct Deployer<'a, R: RemoteApi + ?Sized> {
    remote: &'a R,
    notifier: Box<dyn Notifier + 'a>,
    prompter: Box<dyn Prompter + 'a>,
    files: Box<dyn FileSource + 'a>,
}

impl<'a, R: RemoteApi + ?Sized> Deployer<'a, R> {
    pub fn new(remote: &'a R) -> Self {
        Self {
            remote,
            notifier: Box::new(Silent),
            prompter: Box::new(NoPrompt),
            files: Box::new(LocalFiles),
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'a) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_prompter(mut self, prompter: impl Prompter + 'a) -> Self {
        self.prompter = Box::new(prompter);
        self
    }

    pub fn with_files(mut self, files: impl FileSource + 'a) -> Self {
        self.files = Box::new(files);
        self
    }

    /// Extract the operations of a document without touching the remote.
    pub fn extract(&mut self, document: Value, config_dir: Option<&Path>, reverse: bool) -> Result<Vec<Operation>> {
        let mut options = ExtractOptions::new().reverse(reverse);
        if let Some(dir) = config_dir {
            options = options.config_dir(dir);
        }
        extract(document, &options, self.prompter.as_mut(), self.files.as_ref())
    }

    /// Run operations as one pass with a fresh token cache.
    pub fn execute(&mut self, operations: Vec<Operation>, pass: Pass) -> Result<PathNames> {
        execute(
            operations,
            pass,
            self.remote,
            self.notifier.as_mut(),
            &mut ExpandCache::new(),
        )
    }

    /// Extract then execute one document.
    pub fn deploy_document(&mut self, document: Value, pass: Pass, config_dir: Option<&Path>) -> Result<PathNames> {
        let operations = self.extract(document, config_dir, pass.is_undeploy())?;
        self.execute(operations, pass)
    }

    /// Deploy every document found under `sources`, one pass each.
    ///
    /// Documents run in path order with their own directory as config dir.
    /// Returns the `(path:name, id)` pairs of all passes in order.
    pub fn deploy_many<P: AsRef<Path>>(&mut self, sources: &[P], pass: Pass) -> Result<Vec<(String, Value)>> {
        let documents = collect_documents(sources);
        let total = documents.len();
        let mut results = Vec::new();

        for (i, path) in documents.iter().enumerate() {
            let text = self.files.read_text(path)?;
            let document = parse_document(path, &text)?;
            results.extend(self.deploy_document(document, pass, path.parent())?);

            let file_name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            self.notifier
                .notify(&format!("[{}/{total}] {} {file_name}", i + 1, pass.verb()));
        }

        self.notifier
            .notify(&format!("{} {total}/{total} file(s)", pass.verb()));
        Ok(results)
    }
}
