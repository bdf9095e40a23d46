//! Asset Reconcile Config CLI
//!
//! View and manage reconciliation configuration.

use clap::{Parser, Subcommand};
use asset_reconcile::ReconcileConfig;

#[derive(Parser)]
#[command(name = "asset-reconcile-config")]
#[command(about = "View and manage asset reconciliation configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Show {
        /// Config file to load (optional)
        #[arg(short, long)]
        config: Option<String>,

        /// Output as TOML
        #[arg(long)]
        toml: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize a new config file
    Init {
        /// Output path (default: reconcile.toml)
        #[arg(short, long, default_value = "reconcile.toml")]
        output: String,
    },

    /// Validate configuration
    Validate {
        /// Config file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Show { config, toml, json } => {
            let cfg = ReconcileConfig::load_from(config.as_deref())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else if toml {
                println!("{}", ::toml::to_string_pretty(&cfg)?);
            } else {
                println!("📋 Asset Reconcile Configuration\n");
                println!("Project:");
                println!("  Root: {:?}", cfg.project.root);
                println!("  Assets: {}", cfg.project.assets_dir);
                println!("  Documents: {}", cfg.project.document_extensions.join(", "));

                println!("\nNormalize:");
                println!("  Ruleset: {}", cfg.normalize.ruleset);

                println!("\nCollisions:");
                println!("  Policy: {}", cfg.collisions.policy);

                println!("\nFuzzy:");
                println!("  Min cleaned length: {}", cfg.fuzzy.min_clean_len);
                println!("  Similarity threshold: {}", cfg.fuzzy.similarity_threshold);

                println!("\nRewrite:");
                println!("  Fix case mismatches: {}", cfg.rewrite.fix_case_mismatches);

                println!("\nReport:");
                println!("  Mapping file: {}", cfg.report.mapping_file);
                println!("  Format: {:?}", cfg.report.format);
            }
        }

        Commands::Init { output } => {
            let cfg = ReconcileConfig::default();
            cfg.save(&output)?;
            println!("✅ Created config file: {}", output);
        }

        Commands::Validate { config } => match ReconcileConfig::load_from(config.as_deref()) {
            Ok(cfg) => {
                if cfg.fuzzy.similarity_threshold < 0.0 || cfg.fuzzy.similarity_threshold > 1.0 {
                    eprintln!(
                        "❌ fuzzy.similarity_threshold must be within [0, 1], got {}",
                        cfg.fuzzy.similarity_threshold
                    );
                    std::process::exit(1);
                }
                println!("✅ Configuration is valid");
                println!("   Root: {:?}", cfg.project.root);
                println!("   Ruleset: {}", cfg.normalize.ruleset);
                println!("   Policy: {}", cfg.collisions.policy);
            }
            Err(e) => {
                eprintln!("❌ Configuration error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
