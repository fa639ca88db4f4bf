//! Document discovery and parsing

use crate::error::{Error, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DOCUMENT_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Collect the documents named by `sources`, sorted by path.
///
/// A file source is kept when it has a YAML extension. A directory source
/// contributes its direct YAML children. Missing sources are skipped.
pub fn collect_documents<P: AsRef<Path>>(sources: &[P]) -> Vec<PathBuf> {
    let mut documents = Vec::new();

    for source in sources {
        let source = source.as_ref();
        if source.is_dir() {
            for entry in WalkDir::new(source)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() && is_document(entry.path()) {
                    documents.push(entry.into_path());
                }
            }
        } else if source.is_file() && is_document(source) {
            documents.push(source.to_path_buf());
        } else {
            log::debug!("skipping {}", source.display());
        }
    }

    documents.sort();
    documents
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| DOCUMENT_EXTENSIONS.contains(&e))
}

/// Read and parse one YAML document.
pub fn load_document(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_document(path, &text)
}

/// Parse YAML text into an order-preserving tree. Empty text is `null`.
pub fn parse_document(path: &Path, text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(text).map_err(|e| Error::Document {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
