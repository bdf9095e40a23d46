//! Asset Storage
//!
//! The "apply" half of a pass. [`AssetStore`] is the only way the crate
//! renames or deletes assets; [`apply`] runs a decided plan against it and
//! records every outcome instead of stopping at the first failure.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::collision::Decision;
use crate::error::{ReconcileError, Result};

/// Asset names found by a scan, plus the entries that could not be read
#[derive(Debug, Clone, Default)]
pub struct AssetListing {
    pub names: BTreeSet<String>,
    pub failures: Vec<Failure>,
}

/// Destructive primitives over a flat set of named assets
pub trait AssetStore {
    /// Current asset filenames, hidden files excluded; unreadable entries
    /// are reported instead of ending the scan
    fn scan(&self) -> Result<AssetListing>;

    fn list(&self) -> Result<BTreeSet<String>> {
        Ok(self.scan()?.names)
    }

    fn exists(&self, name: &str) -> bool;

    fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    fn delete(&mut self, name: &str) -> Result<()>;

    /// Location of `name`, for reporting
    fn locate(&self, name: &str) -> PathBuf;
}

/// An asset directory on disk
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ReconcileError::NotADirectory(root));
        }
        Ok(Self { root })
    }
}

impl AssetStore for DirectoryStore {
    fn scan(&self) -> Result<AssetListing> {
        let mut listing = AssetListing::default();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                    warn!("could not read {}: {}", path.display(), e);
                    listing.failures.push(Failure {
                        path,
                        error: ReconcileError::from(e).to_string(),
                    });
                    continue;
                }
            };
            // symlinked assets count when they point at a file
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('.') {
                continue;
            }
            listing.names.insert(name.into_owned());
        }
        Ok(listing)
    }

    fn exists(&self, name: &str) -> bool {
        self.root.join(name).exists()
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        fs::rename(self.root.join(from), self.root.join(to))?;
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        fs::remove_file(self.root.join(name))?;
        Ok(())
    }

    fn locate(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

// =============================================================================
// Applying decisions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Renamed {
    pub from: String,
    pub to: String,
    pub via_temp: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deleted {
    pub file: String,
    pub survivor: String,
    pub canonical: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub name: String,
    pub reason: String,
}

/// A per-item I/O failure; the pass carries on after recording it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of [`apply`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub dry_run: bool,
    pub renamed: Vec<Renamed>,
    pub deleted: Vec<Deleted>,
    pub skipped: Vec<Skipped>,
    /// Collisions left for a later pass, as `(canonical, contributors)`
    pub unresolved: Vec<(String, Vec<String>)>,
    pub failures: Vec<Failure>,
}

impl ApplyReport {
    /// Old name -> name it can now be found under, for reference rewriting.
    ///
    /// Deleted duplicates point at the canonical name their survivor holds.
    pub fn applied_mapping(&self) -> BTreeMap<String, String> {
        let mut mapping: BTreeMap<String, String> = self
            .renamed
            .iter()
            .map(|r| (r.from.clone(), r.to.clone()))
            .collect();
        for d in &self.deleted {
            mapping.insert(d.file.clone(), d.canonical.clone());
        }
        mapping
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Execute `decisions` in order against `store`
pub fn apply<S: AssetStore + ?Sized>(decisions: &[Decision], store: &mut S, dry_run: bool) -> ApplyReport {
    let mut report = ApplyReport {
        dry_run,
        ..Default::default()
    };

    for decision in decisions {
        match decision {
            Decision::Rename { from, to, via_temp } => {
                apply_rename(store, from, to, *via_temp, dry_run, &mut report);
            }
            Decision::Delete {
                file,
                survivor,
                canonical,
            } => {
                warn!(file = %file, survivor = %survivor, "deleting duplicate (keeping {})", survivor);
                let outcome = if dry_run { Ok(()) } else { store.delete(file) };
                match outcome {
                    Ok(()) => report.deleted.push(Deleted {
                        file: file.clone(),
                        survivor: survivor.clone(),
                        canonical: canonical.clone(),
                    }),
                    Err(e) => report.failures.push(Failure {
                        path: store.locate(file),
                        error: e.to_string(),
                    }),
                }
            }
            Decision::Unresolved {
                canonical,
                contributors,
            } => {
                warn!(canonical = %canonical, "collision left unresolved: {}", contributors.join(", "));
                report.unresolved.push((canonical.clone(), contributors.clone()));
            }
        }
    }

    report
}

fn apply_rename<S: AssetStore + ?Sized>(
    store: &mut S,
    from: &str,
    to: &str,
    via_temp: bool,
    dry_run: bool,
    report: &mut ApplyReport,
) {
    if !store.exists(from) {
        warn!("{} does not exist, skipping", from);
        report.skipped.push(Skipped {
            name: from.to_string(),
            reason: ReconcileError::AssetNotFound(from.to_string()).to_string(),
        });
        return;
    }

    // A case-only rename sees its own source as the target on
    // case-insensitive filesystems.
    if !via_temp && store.exists(to) {
        warn!("{} already exists, skipping {}", to, from);
        report.skipped.push(Skipped {
            name: from.to_string(),
            reason: ReconcileError::TargetExists {
                source_name: from.to_string(),
                target: to.to_string(),
            }
            .to_string(),
        });
        return;
    }

    if dry_run {
        info!("Would rename: {} -> {}", from, to);
    } else {
        let result = if via_temp {
            rename_via_temp(store, from, to)
        } else {
            store.rename(from, to)
        };
        if let Err(e) = result {
            report.failures.push(Failure {
                path: store.locate(from),
                error: e.to_string(),
            });
            return;
        }
        info!("Renamed: {} -> {}", from, to);
    }

    report.renamed.push(Renamed {
        from: from.to_string(),
        to: to.to_string(),
        via_temp,
    });
}

fn rename_via_temp<S: AssetStore + ?Sized>(store: &mut S, from: &str, to: &str) -> Result<()> {
    let temp = temp_name(store, from);
    store.rename(from, &temp)?;
    if let Err(e) = store.rename(&temp, to) {
        // put the original back so the asset is not stranded under the temp name
        if let Err(restore) = store.rename(&temp, from) {
            warn!("could not restore {} from {}: {}", from, temp, restore);
        }
        return Err(e);
    }
    Ok(())
}

/// Hidden, unused intermediate name for `from`
fn temp_name<S: AssetStore + ?Sized>(store: &S, from: &str) -> String {
    let mut candidate = format!(".{}.tmp", from);
    let mut n = 1;
    while store.exists(&candidate) {
        candidate = format!(".{}.tmp{}", from, n);
        n += 1;
    }
    candidate
}
