//! Rename Mapping
//!
//! Normalizes every filename in an asset directory and records which ones
//! change, which canonical names are claimed by more than one original
//! (collisions), and which originals normalize to nothing (degenerate).
//!
//! The mapping is a plain `old -> new` table. It is not injective: a
//! collision is exactly the case where two keys share a value.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::checksum::Checksum;
use crate::normalize::{is_degenerate, join_filename, split_filename, NameNormalizer, Ruleset};

/// Header line of the audit listing
pub const AUDIT_HEADER: &str = "OLD_FILENAME -> NEW_FILENAME";

/// A canonical name produced by more than one original
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    /// The contested canonical filename
    pub canonical: String,
    /// Originals normalizing to `canonical`, sorted
    pub contributors: Vec<String>,
}

impl Collision {
    /// Contributor that already carries the canonical name, if any
    pub fn in_place(&self) -> Option<&str> {
        self.contributors
            .iter()
            .find(|c| **c == self.canonical)
            .map(String::as_str)
    }
}

/// An original whose base name normalizes to the empty string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegenerateName {
    pub original: String,
    /// What the normalizer produced (e.g. `.png`)
    pub normalized: String,
    /// Name used in the mapping instead
    pub fallback: String,
}

/// Result of a mapping build
#[derive(Debug, Clone, Default, Serialize)]
pub struct MappingReport {
    pub ruleset: Ruleset,
    /// old -> new, for every original whose name changes
    pub mapping: BTreeMap<String, String>,
    pub collisions: Vec<Collision>,
    pub degenerate: Vec<DegenerateName>,
}

impl MappingReport {
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Every original that takes part in some collision
    pub fn colliding_originals(&self) -> BTreeSet<&str> {
        self.collisions
            .iter()
            .flat_map(|c| c.contributors.iter().map(String::as_str))
            .collect()
    }

    /// Sorted `old -> new` listing for human review
    pub fn render_audit(&self) -> String {
        let mut out = String::new();
        out.push_str(AUDIT_HEADER);
        out.push('\n');
        out.push_str(&"=".repeat(80));
        out.push('\n');
        for (old, new) in &self.mapping {
            out.push_str(&format!("{} -> {}\n", old, new));
        }
        out
    }
}

/// Builds a [`MappingReport`] from the current asset filenames
#[derive(Debug, Clone, Copy, Default)]
pub struct MappingBuilder {
    normalizer: NameNormalizer,
}

impl MappingBuilder {
    pub fn new(normalizer: NameNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn with_ruleset(ruleset: Ruleset) -> Self {
        Self::new(NameNormalizer::new(ruleset))
    }

    pub fn build<I, S>(&self, filenames: I) -> MappingReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let originals: BTreeSet<String> = filenames
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut report = MappingReport {
            ruleset: self.normalizer.ruleset(),
            ..Default::default()
        };
        let mut by_target: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for original in originals {
            let normalized = self.normalizer.normalize(&original);

            let target = if is_degenerate(&normalized) {
                let fallback = fallback_name(&original, &normalized);
                report.degenerate.push(DegenerateName {
                    original: original.clone(),
                    normalized,
                    fallback: fallback.clone(),
                });
                fallback
            } else {
                normalized
            };

            if target != original {
                report.mapping.insert(original.clone(), target.clone());
            }
            by_target.entry(target).or_default().push(original);
        }

        report.collisions = by_target
            .into_iter()
            .filter(|(_, contributors)| contributors.len() > 1)
            .map(|(canonical, contributors)| Collision {
                canonical,
                contributors,
            })
            .collect();

        report
    }
}

/// Stand-in for a name with no usable base: `asset-<digest>.<ext>`
pub fn fallback_name(original: &str, normalized: &str) -> String {
    let (_, ext) = split_filename(normalized);
    let base = format!("asset-{}", Checksum::of_name(original).short());
    join_filename(&base, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_changed_names_are_mapped() {
        let report = MappingBuilder::default().build(["logo.png", "Hero_Banner.JPG"]);
        assert_eq!(report.mapping.len(), 1);
        assert_eq!(report.mapping["Hero_Banner.JPG"], "hero-banner.jpg");
        assert!(report.collisions.is_empty());
    }

    #[test]
    fn test_collision_includes_name_already_canonical() {
        let report = MappingBuilder::default().build(["icon.png", "Icon.png", "ICON_.PNG"]);
        assert_eq!(report.collisions.len(), 1);
        let collision = &report.collisions[0];
        assert_eq!(collision.canonical, "icon.png");
        assert_eq!(collision.contributors, vec!["ICON_.PNG", "Icon.png", "icon.png"]);
        assert_eq!(collision.in_place(), Some("icon.png"));
    }

    #[test]
    fn test_duplicate_inputs_are_not_collisions() {
        let report = MappingBuilder::default().build(["A.png", "A.png"]);
        assert!(report.collisions.is_empty());
        assert_eq!(report.mapping["A.png"], "a.png");
    }

    #[test]
    fn test_degenerate_names_get_fallback() {
        let report = MappingBuilder::default().build(["!!!.png"]);
        assert_eq!(report.degenerate.len(), 1);
        let degenerate = &report.degenerate[0];
        assert_eq!(degenerate.normalized, ".png");
        assert!(degenerate.fallback.starts_with("asset-"));
        assert!(degenerate.fallback.ends_with(".png"));
        assert_eq!(report.mapping["!!!.png"], degenerate.fallback);
    }

    #[test]
    fn test_audit_is_sorted_with_header() {
        let report = MappingBuilder::default().build(["Zebra.png", "Apple.png", "ok.png"]);
        let audit = report.render_audit();
        let lines: Vec<&str> = audit.lines().collect();
        assert_eq!(lines[0], AUDIT_HEADER);
        assert_eq!(lines[1], "=".repeat(80));
        assert_eq!(lines[2], "Apple.png -> apple.png");
        assert_eq!(lines[3], "Zebra.png -> zebra.png");
        assert_eq!(lines.len(), 4);
    }
}
