//! Configuration management for asset reconciliation
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (reconcile.toml)
//! - Environment variables (RECONCILE__*)
//!
//! ## Example config file (reconcile.toml):
//! ```toml
//! [project]
//! root = "./site"
//! assets_dir = "images"
//! document_extensions = ["html"]
//!
//! [normalize]
//! ruleset = "v2"
//!
//! [collisions]
//! policy = "skip-and-warn"
//!
//! [fuzzy]
//! min_clean_len = 5
//! similarity_threshold = 0.7
//!
//! [rewrite]
//! fix_case_mismatches = false
//!
//! [report]
//! mapping_file = "image_rename_mapping.txt"
//! format = "text"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::collision::CollisionPolicy;
use crate::normalize::Ruleset;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReconcileConfig {
    /// Where the site lives
    #[serde(default)]
    pub project: ProjectConfig,

    /// Normalization rules
    #[serde(default)]
    pub normalize: NormalizeConfig,

    /// Collision handling
    #[serde(default)]
    pub collisions: CollisionConfig,

    /// Fuzzy matching thresholds
    #[serde(default)]
    pub fuzzy: FuzzyConfig,

    /// Reference rewriting
    #[serde(default)]
    pub rewrite: RewriteConfig,

    /// Audit and summary output
    #[serde(default)]
    pub report: ReportConfig,
}

/// Project layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project root containing documents and the asset directory
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Asset directory name, relative to the root; also the path segment
    /// references use to point at assets
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    /// Extensions of documents whose references are rewritten
    #[serde(default = "default_document_extensions")]
    pub document_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NormalizeConfig {
    #[serde(default)]
    pub ruleset: Ruleset,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CollisionConfig {
    #[serde(default)]
    pub policy: CollisionPolicy,
}

/// Thresholds for accepting a non-exact match
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FuzzyConfig {
    /// Cleaned base names must be strictly longer than this
    #[serde(default = "default_min_clean_len")]
    pub min_clean_len: usize,

    /// Character-set similarity must be strictly greater than this
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RewriteConfig {
    /// Rewrite references that differ from an asset only by letter case
    #[serde(default)]
    pub fix_case_mismatches: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Audit listing written next to the project root
    #[serde(default = "default_mapping_file")]
    pub mapping_file: String,

    /// Summary output format
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for pass summaries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

// Default value functions
fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_assets_dir() -> String {
    "images".to_string()
}

fn default_document_extensions() -> Vec<String> {
    vec!["html".to_string()]
}

fn default_min_clean_len() -> usize {
    5
}

fn default_similarity_threshold() -> f64 {
    0.7
}

fn default_mapping_file() -> String {
    "image_rename_mapping.txt".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            assets_dir: default_assets_dir(),
            document_extensions: default_document_extensions(),
        }
    }
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            min_clean_len: default_min_clean_len(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            mapping_file: default_mapping_file(),
            format: OutputFormat::Text,
        }
    }
}

impl ReconcileConfig {
    /// Load configuration, with an optional explicit file on top
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["reconcile.toml", ".reconcile.toml", "config/reconcile.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "asset-reconcile", "reconcile") {
            let xdg_config = config_dir.config_dir().join("reconcile.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // RECONCILE__FUZZY__SIMILARITY_THRESHOLD=0.8
        builder = builder.add_source(
            Environment::with_prefix("RECONCILE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Project root (resolves relative paths)
    pub fn project_root(&self) -> PathBuf {
        if self.project.root.is_absolute() {
            self.project.root.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.project.root)
        }
    }

    pub fn assets_path(&self) -> PathBuf {
        self.project_root().join(&self.project.assets_dir)
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.project_root().join(&self.report.mapping_file)
    }
}
