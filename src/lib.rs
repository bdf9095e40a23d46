//! Asset Reconcile
//!
//! Normalizes exported asset filenames into canonical URL-safe names and
//! repairs the references documents make to them.
//!
//! ## Features
//!
//! - **Idempotent normalization**: hash prefixes, `X_1X` duplicates, case and
//!   punctuation folded away; running it twice changes nothing
//! - **Versioned rulesets**: each pass names the rules it ran with
//! - **Two-phase renames**: every rename and deletion is decided before any
//!   is applied, and deletions are logged with the name they yield to
//! - **Fuzzy repair**: stale references matched to assets by containment and
//!   character-set similarity, in a fixed order
//! - **Prefix-preserving rewrites**: `../images/` stays `../images/`
//!
//! ## Flow
//!
//! ```text
//! images/ ──► MappingBuilder ──► CollisionResolver ──► apply (AssetStore)
//!                                                           │
//!                                   applied mapping + assets ▼
//! *.html ─────────────────────────────────────────► ReferenceRewriter
//! ```

pub mod checksum;
pub mod collision;
pub mod config;
pub mod corpus;
pub mod error;
pub mod fuzzy;
pub mod mapping;
pub mod normalize;
pub mod pass;
pub mod rewrite;
pub mod store;

pub use collision::{CollisionPolicy, CollisionResolver, Decision};
pub use config::ReconcileConfig;
pub use corpus::{Corpus, Discovery};
pub use error::{ReconcileError, Result};
pub use fuzzy::FuzzyResolver;
pub use mapping::{Collision, MappingBuilder, MappingReport};
pub use normalize::{normalize, NameNormalizer, Ruleset};
pub use pass::PassSummary;
pub use rewrite::{ReferenceRewriter, RewriteStats};
pub use store::{AssetListing, AssetStore, DirectoryStore};
