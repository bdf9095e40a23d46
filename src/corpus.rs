//! Document corpus: finding, reading and writing the markup files whose
//! asset references get rewritten.

use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{ReconcileError, Result};
use crate::store::Failure;

/// Documents found by [`Corpus::discover`], plus the paths the walk could not enter
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub documents: Vec<PathBuf>,
    pub failures: Vec<Failure>,
}

#[derive(Debug, Clone)]
pub struct Corpus {
    root: PathBuf,
    extensions: Vec<String>,
}

impl Corpus {
    pub fn new(root: impl AsRef<Path>, extensions: &[String]) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Documents under the root, sorted; hidden files and directories skipped.
    ///
    /// A directory that cannot be read becomes a failure and the walk goes on.
    pub fn discover(&self) -> Discovery {
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .hidden(true)
            .build();

        let mut discovery = Discovery::default();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = error_path(&e).unwrap_or_else(|| self.root.clone());
                    warn!("could not walk {}: {}", path.display(), e);
                    discovery.failures.push(Failure {
                        path,
                        error: ReconcileError::from(e).to_string(),
                    });
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if self.is_document(path) {
                discovery.documents.push(path.to_path_buf());
            }
        }
        discovery.documents.sort();
        discovery
    }

    fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_ascii_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }

    pub fn read(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }

    pub fn write(&self, path: &Path, content: &str) -> Result<()> {
        Ok(fs::write(path, content)?)
    }

    /// Path relative to the root, for messages
    pub fn display_path<'a>(&self, path: &'a Path) -> std::borrow::Cow<'a, str> {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
    }
}

fn error_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.clone()),
        _ => None,
    }
}
