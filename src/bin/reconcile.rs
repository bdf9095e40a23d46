//! Asset Reconcile CLI
//!
//! Renames assets to canonical names and repairs document references.
//!
//! Usage:
//!   asset-reconcile --root ./site plan
//!   asset-reconcile --root ./site rename --policy delete-duplicates --dry-run
//!   asset-reconcile --root ./site fix-refs
//!   asset-reconcile --root ./site run

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use asset_reconcile::config::OutputFormat;
use asset_reconcile::corpus::Corpus;
use asset_reconcile::pass::{self, PassSummary};
use asset_reconcile::{
    AssetStore, CollisionPolicy, DirectoryStore, NameNormalizer, ReconcileConfig,
    ReferenceRewriter, Ruleset,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "asset-reconcile")]
#[command(about = "Normalize asset filenames and repair references to them")]
#[command(version)]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Project root (overrides config)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, global = true)]
    format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the rename mapping and write the audit listing
    Plan {
        /// Normalization ruleset (v1, v2)
        #[arg(long)]
        ruleset: Option<String>,
    },

    /// Rename assets to their canonical names
    Rename {
        /// Normalization ruleset (v1, v2)
        #[arg(long)]
        ruleset: Option<String>,
        /// Collision policy (skip-and-warn, delete-duplicates)
        #[arg(long)]
        policy: Option<String>,
        /// Report what would change without touching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Repair asset references in documents
    FixRefs {
        /// Respell references that differ from an asset only by case
        #[arg(long)]
        fix_case: bool,
        /// Report what would change without touching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Rename, then repair references
    Run {
        #[arg(long)]
        ruleset: Option<String>,
        #[arg(long)]
        policy: Option<String>,
        #[arg(long)]
        fix_case: bool,
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the canonical form of filenames
    Normalize {
        #[arg(long)]
        ruleset: Option<String>,
        #[arg(required = true)]
        names: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every item went through without an I/O failure
fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = ReconcileConfig::load_from(cli.config.as_deref())
        .context("loading configuration")?;
    if let Some(root) = cli.root {
        config.project.root = root;
    }
    if let Some(format) = cli.format.as_deref() {
        config.report.format = match format {
            "json" => OutputFormat::Json,
            "text" => OutputFormat::Text,
            other => anyhow::bail!("unknown format '{}' (expected text or json)", other),
        };
    }

    match cli.command {
        Commands::Normalize { ruleset, names } => {
            let normalizer = NameNormalizer::new(pick_ruleset(&config, ruleset)?);
            for name in names {
                println!("{} -> {}", name, normalizer.normalize(&name));
            }
            Ok(true)
        }

        Commands::Plan { ruleset } => {
            let ruleset = pick_ruleset(&config, ruleset)?;
            let store = open_store(&config)?;

            println!("🔍 Generating filename mapping ({})...", ruleset);
            let report = pass::plan(&store, ruleset)?;
            if report.is_empty() {
                println!("   All asset names are already canonical");
            } else {
                println!("   Found {} files to rename", report.mapping.len());
            }

            for collision in &report.collisions {
                println!(
                    "   ⚠️  {} <- {}",
                    collision.canonical,
                    collision.contributors.join(", ")
                );
            }
            for degenerate in &report.degenerate {
                println!("   ⚠️  {} -> {} (fallback)", degenerate.original, degenerate.fallback);
            }

            let mapping_path = config.mapping_path();
            pass::write_audit(&report, &mapping_path)?;
            println!("📄 Mapping saved to: {}", mapping_path.display());

            if config.report.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(true)
        }

        Commands::Rename {
            ruleset,
            policy,
            dry_run,
        } => {
            config.normalize.ruleset = pick_ruleset(&config, ruleset)?;
            config.collisions.policy = pick_policy(&config, policy)?;

            let mut summary = PassSummary::new(&config, dry_run);
            rename_phase(&config, dry_run, &mut summary)?;
            print_summary(&config, &summary)?;
            Ok(!summary.has_failures())
        }

        Commands::FixRefs { fix_case, dry_run } => {
            if fix_case {
                config.rewrite.fix_case_mismatches = true;
            }
            let mut summary = PassSummary::new(&config, dry_run);
            rewrite_phase(&config, &Default::default(), dry_run, &mut summary)?;
            print_summary(&config, &summary)?;
            Ok(!summary.has_failures())
        }

        Commands::Run {
            ruleset,
            policy,
            fix_case,
            dry_run,
        } => {
            config.normalize.ruleset = pick_ruleset(&config, ruleset)?;
            config.collisions.policy = pick_policy(&config, policy)?;
            if fix_case {
                config.rewrite.fix_case_mismatches = true;
            }

            let mut summary = PassSummary::new(&config, dry_run);
            let mapping = rename_phase(&config, dry_run, &mut summary)?;
            rewrite_phase(&config, &mapping, dry_run, &mut summary)?;
            print_summary(&config, &summary)?;
            Ok(!summary.has_failures())
        }
    }
}

fn pick_ruleset(config: &ReconcileConfig, arg: Option<String>) -> anyhow::Result<Ruleset> {
    Ok(match arg {
        Some(s) => s.parse()?,
        None => config.normalize.ruleset,
    })
}

fn pick_policy(config: &ReconcileConfig, arg: Option<String>) -> anyhow::Result<CollisionPolicy> {
    Ok(match arg {
        Some(s) => s.parse()?,
        None => config.collisions.policy,
    })
}

fn open_store(config: &ReconcileConfig) -> anyhow::Result<DirectoryStore> {
    let path = config.assets_path();
    DirectoryStore::open(&path).with_context(|| format!("opening asset directory {}", path.display()))
}

/// Rename assets; returns the mapping that was actually applied
fn rename_phase(
    config: &ReconcileConfig,
    dry_run: bool,
    summary: &mut PassSummary,
) -> anyhow::Result<std::collections::BTreeMap<String, String>> {
    let mut store = open_store(config)?;

    println!(
        "🔧 Renaming assets ({}, {})...",
        config.normalize.ruleset, config.collisions.policy
    );
    let outcome = pass::rename_pass(
        &mut store,
        config.normalize.ruleset,
        config.collisions.policy,
        dry_run,
    )?;

    if !dry_run {
        pass::write_audit(&outcome.report, &config.mapping_path())?;
    }

    for renamed in &outcome.applied.renamed {
        let verb = if dry_run { "Would rename" } else { "Renamed" };
        let note = if renamed.via_temp { " (case)" } else { "" };
        println!("   {}{}: {} -> {}", verb, note, renamed.from, renamed.to);
    }

    summary.record_rename(&outcome);
    Ok(outcome.applied.applied_mapping())
}

fn rewrite_phase(
    config: &ReconcileConfig,
    mapping: &std::collections::BTreeMap<String, String>,
    dry_run: bool,
    summary: &mut PassSummary,
) -> anyhow::Result<()> {
    let store = open_store(config)?;
    // a dry-run rename leaves the old names on disk; match against where
    // the assets would be
    let listing = store.scan()?;
    summary.record_failures(&listing.failures);
    let mut assets = listing.names;
    if dry_run {
        for (old, new) in mapping {
            assets.remove(old);
            assets.insert(new.clone());
        }
    }

    let corpus = Corpus::new(config.project_root(), &config.project.document_extensions);
    let rewriter = ReferenceRewriter::new(&config.project.assets_dir, config.fuzzy, &config.rewrite)?;

    println!("📝 Updating documents...");
    let outcome = pass::rewrite_pass(&corpus, &rewriter, mapping, &assets, dry_run);

    for doc in outcome.documents.iter().filter(|d| d.changed) {
        let verb = if dry_run { "Would fix" } else { "Fixed" };
        println!(
            "   {} {} references in: {}",
            verb,
            doc.stats.fixes(),
            corpus.display_path(&doc.path)
        );
    }

    summary.record_rewrite(&outcome);
    Ok(())
}

fn print_summary(config: &ReconcileConfig, summary: &PassSummary) -> anyhow::Result<()> {
    println!();
    match config.report.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
        OutputFormat::Text => {
            println!("{}", "=".repeat(80));
            print!("{}", summary.render_text());
            println!("{}", "=".repeat(80));
            if summary.has_failures() {
                println!("❌ Completed with {} failures", summary.failures.len());
            } else {
                println!("✅ Complete!");
            }
        }
    }
    Ok(())
}
