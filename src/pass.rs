//! Reconciliation Passes
//!
//! Wires the pieces together for the binaries:
//!
//! ```text
//! rename_pass:  list assets -> MappingBuilder -> CollisionResolver -> apply
//! rewrite_pass: discover documents -> ReferenceRewriter (applied mapping, assets)
//! ```
//!
//! Neither pass stops on a bad file. Failures are collected per item and
//! end up in the [`PassSummary`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::collision::{CollisionPolicy, CollisionResolver, Decision};
use crate::config::ReconcileConfig;
use crate::corpus::Corpus;
use crate::error::Result;
use crate::mapping::{MappingBuilder, MappingReport};
use crate::normalize::Ruleset;
use crate::rewrite::{ReferenceRewriter, RewriteStats};
use crate::store::{apply, ApplyReport, AssetStore, Failure};

// =============================================================================
// Rename pass
// =============================================================================

/// Everything a rename pass decided and did
#[derive(Debug, Clone)]
pub struct RenameOutcome {
    pub report: MappingReport,
    pub decisions: Vec<Decision>,
    pub applied: ApplyReport,
}

/// Build the mapping for the assets in `store` without touching anything
pub fn plan<S: AssetStore + ?Sized>(store: &S, ruleset: Ruleset) -> Result<MappingReport> {
    let assets = store.list()?;
    Ok(build_report(&assets, ruleset))
}

fn build_report(assets: &BTreeSet<String>, ruleset: Ruleset) -> MappingReport {
    info!("Found {} assets", assets.len());

    let report = MappingBuilder::with_ruleset(ruleset).build(assets);
    for degenerate in &report.degenerate {
        warn!(
            "{} normalizes to an empty name ({}), using {}",
            degenerate.original, degenerate.normalized, degenerate.fallback
        );
    }
    for collision in &report.collisions {
        warn!(
            "collision on {}: {}",
            collision.canonical,
            collision.contributors.join(", ")
        );
    }
    report
}

/// Decide, then apply
pub fn rename_pass<S: AssetStore + ?Sized>(
    store: &mut S,
    ruleset: Ruleset,
    policy: CollisionPolicy,
    dry_run: bool,
) -> Result<RenameOutcome> {
    let listing = store.scan()?;
    let report = build_report(&listing.names, ruleset);
    let decisions = CollisionResolver::new(policy).resolve(&report);
    debug!("{} decisions under {}", decisions.len(), policy);

    let mut applied = apply(&decisions, store, dry_run);
    let mut failures = listing.failures;
    failures.append(&mut applied.failures);
    applied.failures = failures;
    Ok(RenameOutcome {
        report,
        decisions,
        applied,
    })
}

/// Write the sorted `old -> new` audit listing
pub fn write_audit(report: &MappingReport, path: &Path) -> Result<()> {
    fs::write(path, report.render_audit())?;
    info!("Mapping saved to: {}", path.display());
    Ok(())
}

// =============================================================================
// Rewrite pass
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedReference {
    pub document: PathBuf,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentResult {
    pub path: PathBuf,
    pub changed: bool,
    pub stats: RewriteStats,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RewriteOutcome {
    pub dry_run: bool,
    pub documents: Vec<DocumentResult>,
    pub totals: RewriteStats,
    pub unresolved: Vec<UnresolvedReference>,
    pub failures: Vec<Failure>,
}

impl RewriteOutcome {
    pub fn updated_documents(&self) -> usize {
        self.documents.iter().filter(|d| d.changed).count()
    }
}

/// Rewrite every document in `corpus` against the current `assets`
pub fn rewrite_pass(
    corpus: &Corpus,
    rewriter: &ReferenceRewriter,
    mapping: &BTreeMap<String, String>,
    assets: &BTreeSet<String>,
    dry_run: bool,
) -> RewriteOutcome {
    let discovery = corpus.discover();
    info!("Found {} documents", discovery.documents.len());

    let mut outcome = RewriteOutcome {
        dry_run,
        failures: discovery.failures,
        ..Default::default()
    };

    for path in discovery.documents {
        let content = match corpus.read(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("could not read {}: {}", path.display(), e);
                outcome.failures.push(Failure {
                    path,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let (rewritten, stats) = rewriter.rewrite(&content, mapping, assets);
        let changed = rewritten != content;

        for filename in &stats.unresolved {
            warn!("unresolved reference {} in {}", filename, corpus.display_path(&path));
            outcome.unresolved.push(UnresolvedReference {
                document: path.clone(),
                filename: filename.clone(),
            });
        }

        if changed {
            if dry_run {
                info!("Would update: {}", corpus.display_path(&path));
            } else if let Err(e) = corpus.write(&path, &rewritten) {
                warn!("could not write {}: {}", path.display(), e);
                outcome.failures.push(Failure {
                    path,
                    error: e.to_string(),
                });
                continue;
            } else {
                info!("Fixed {} references in: {}", stats.fixes(), corpus.display_path(&path));
            }
        }

        outcome.totals.merge(&stats);
        outcome.documents.push(DocumentResult {
            path,
            changed,
            stats,
        });
    }

    outcome
}

// =============================================================================
// Summary
// =============================================================================

/// Counts printed at the end of a run
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub generated_at: DateTime<Utc>,
    pub ruleset: Ruleset,
    pub policy: CollisionPolicy,
    pub dry_run: bool,
    pub renamed: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub unresolved_collisions: usize,
    pub degenerate: usize,
    pub documents_updated: usize,
    pub references_fixed: usize,
    pub fixed_by_mapping: usize,
    pub fixed_by_fuzzy: usize,
    pub fixed_case: usize,
    pub unresolved_references: Vec<UnresolvedReference>,
    pub failures: Vec<Failure>,
    pub warnings: Vec<String>,
}

impl PassSummary {
    pub fn new(config: &ReconcileConfig, dry_run: bool) -> Self {
        Self {
            generated_at: Utc::now(),
            ruleset: config.normalize.ruleset,
            policy: config.collisions.policy,
            dry_run,
            renamed: 0,
            deleted: 0,
            skipped: 0,
            unresolved_collisions: 0,
            degenerate: 0,
            documents_updated: 0,
            references_fixed: 0,
            fixed_by_mapping: 0,
            fixed_by_fuzzy: 0,
            fixed_case: 0,
            unresolved_references: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record_rename(&mut self, outcome: &RenameOutcome) {
        let applied = &outcome.applied;
        self.renamed += applied.renamed.len();
        self.deleted += applied.deleted.len();
        self.skipped += applied.skipped.len();
        self.unresolved_collisions += applied.unresolved.len();
        self.degenerate += outcome.report.degenerate.len();
        self.record_failures(&applied.failures);

        for d in &outcome.report.degenerate {
            self.warnings.push(format!(
                "{} has no usable name, renamed to {}",
                d.original, d.fallback
            ));
        }
        for s in &applied.skipped {
            self.warnings.push(format!("skipped {}: {}", s.name, s.reason));
        }
        for d in &applied.deleted {
            self.warnings.push(format!("deleted duplicate {} (kept {})", d.file, d.survivor));
        }
        for (canonical, contributors) in &applied.unresolved {
            self.warnings.push(format!(
                "unresolved collision on {}: {}",
                canonical,
                contributors.join(", ")
            ));
        }
    }

    pub fn record_rewrite(&mut self, outcome: &RewriteOutcome) {
        self.documents_updated += outcome.updated_documents();
        self.references_fixed += outcome.totals.fixes();
        self.fixed_by_mapping += outcome.totals.fixed_by_mapping;
        self.fixed_by_fuzzy += outcome.totals.fixed_by_fuzzy;
        self.fixed_case += outcome.totals.fixed_case;
        self.unresolved_references.extend(outcome.unresolved.iter().cloned());
        self.record_failures(&outcome.failures);
    }

    /// Add failures not already recorded by an earlier phase
    pub fn record_failures(&mut self, failures: &[Failure]) {
        for failure in failures {
            if !self.failures.contains(failure) {
                self.failures.push(failure.clone());
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn render_text(&self) -> String {
        let verb = if self.dry_run { "Would rename" } else { "Renamed" };
        let mut out = String::new();
        out.push_str(&format!("{} {} files\n", verb, self.renamed));
        out.push_str(&format!("Deleted {} duplicates\n", self.deleted));
        out.push_str(&format!("Skipped {} files\n", self.skipped));
        out.push_str(&format!("Unresolved collisions: {}\n", self.unresolved_collisions));
        out.push_str(&format!("Updated {} documents\n", self.documents_updated));
        out.push_str(&format!(
            "Total fixes: {} (mapping {}, fuzzy {}, case {})\n",
            self.references_fixed, self.fixed_by_mapping, self.fixed_by_fuzzy, self.fixed_case
        ));
        out.push_str(&format!("Unresolved references: {}\n", self.unresolved_references.len()));
        for r in &self.unresolved_references {
            out.push_str(&format!("  {} in {}\n", r.filename, r.document.display()));
        }
        if !self.warnings.is_empty() {
            out.push_str("Warnings:\n");
            for w in &self.warnings {
                out.push_str(&format!("  {}\n", w));
            }
        }
        if !self.failures.is_empty() {
            out.push_str("Failures:\n");
            for f in &self.failures {
                out.push_str(&format!("  {}: {}\n", f.path.display(), f.error));
            }
        }
        out
    }
}
