//! Reference Rewriting
//!
//! Scans document text for `<../ ...><assets_dir>/<filename>` references and
//! repairs filenames that no longer name an asset. Lookup order per token:
//!
//! 1. width descriptor (`photo-500w`, or anything with whitespace): skipped
//! 2. exactly an asset: kept
//! 3. key in the rename mapping: replaced by the mapped name
//! 4. an asset ignoring case: kept, or respelled when `fix_case_mismatches`
//! 5. fuzzy match against the assets: replaced by the match
//! 6. otherwise left as-is and reported unresolved
//!
//! Only the filename segment is ever replaced; the relative prefix a
//! document uses to reach the asset directory is kept byte for byte, and so
//! is whatever follows the filename: a `?query` or `#fragment`, the `)`
//! closing a CSS `url(...)`, or the `,` separating `srcset` entries.

use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::{FuzzyConfig, RewriteConfig};
use crate::error::Result;
use crate::fuzzy::{find_case_insensitive, FuzzyResolver};

/// Counts for one rewrite (or a sum over many)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteStats {
    pub fixed_by_mapping: usize,
    pub fixed_by_fuzzy: usize,
    pub fixed_case: usize,
    pub already_correct: usize,
    pub skipped_descriptors: usize,
    /// Filenames that matched nothing, in document order
    pub unresolved: Vec<String>,
}

impl RewriteStats {
    /// References whose text was changed
    pub fn fixes(&self) -> usize {
        self.fixed_by_mapping + self.fixed_by_fuzzy + self.fixed_case
    }

    pub fn merge(&mut self, other: &RewriteStats) {
        self.fixed_by_mapping += other.fixed_by_mapping;
        self.fixed_by_fuzzy += other.fixed_by_fuzzy;
        self.fixed_case += other.fixed_case;
        self.already_correct += other.already_correct;
        self.skipped_descriptors += other.skipped_descriptors;
        self.unresolved.extend(other.unresolved.iter().cloned());
    }
}

/// What happened to a single filename token
#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenOutcome {
    Descriptor,
    Correct,
    Case(String),
    Mapped(String),
    Fuzzy(String),
    Unresolved,
}

pub struct ReferenceRewriter {
    pattern: Regex,
    fuzzy: FuzzyResolver,
    fix_case_mismatches: bool,
}

impl ReferenceRewriter {
    /// Rewriter for references into `assets_dir` (e.g. `images`)
    pub fn new(assets_dir: &str, fuzzy: FuzzyConfig, rewrite: &RewriteConfig) -> Result<Self> {
        let dir = assets_dir.trim_matches('/');
        let pattern = Regex::new(&format!(
            r#"((?:\.\./)*{}/)([^"'\s?#<>]+)"#,
            regex::escape(dir)
        ))?;
        Ok(Self {
            pattern,
            fuzzy: FuzzyResolver::new(fuzzy),
            fix_case_mismatches: rewrite.fix_case_mismatches,
        })
    }

    /// Rewrite every reference in `text`
    pub fn rewrite(
        &self,
        text: &str,
        mapping: &BTreeMap<String, String>,
        assets: &BTreeSet<String>,
    ) -> (String, RewriteStats) {
        let mut stats = RewriteStats::default();

        let rewritten = self.pattern.replace_all(text, |caps: &Captures| {
            let prefix = &caps[1];
            let (filename, suffix) = split_trailing(&caps[2]);
            if filename.is_empty() {
                return caps[0].to_string();
            }

            let replacement = match self.classify(filename, mapping, assets) {
                TokenOutcome::Descriptor => {
                    stats.skipped_descriptors += 1;
                    None
                }
                TokenOutcome::Correct => {
                    stats.already_correct += 1;
                    None
                }
                TokenOutcome::Case(actual) => {
                    stats.fixed_case += 1;
                    Some(actual)
                }
                TokenOutcome::Mapped(new) => {
                    stats.fixed_by_mapping += 1;
                    Some(new)
                }
                TokenOutcome::Fuzzy(found) => {
                    stats.fixed_by_fuzzy += 1;
                    Some(found)
                }
                TokenOutcome::Unresolved => {
                    stats.unresolved.push(filename.to_string());
                    None
                }
            };

            match replacement {
                Some(name) => format!("{}{}{}", prefix, name, suffix),
                None => caps[0].to_string(),
            }
        });

        (rewritten.into_owned(), stats)
    }

    fn classify(
        &self,
        filename: &str,
        mapping: &BTreeMap<String, String>,
        assets: &BTreeSet<String>,
    ) -> TokenOutcome {
        if is_width_descriptor(filename) {
            return TokenOutcome::Descriptor;
        }
        if assets.contains(filename) {
            return TokenOutcome::Correct;
        }
        if let Some(new) = mapping.get(filename) {
            return TokenOutcome::Mapped(new.clone());
        }
        if let Some(actual) = find_case_insensitive(filename, assets) {
            return if self.fix_case_mismatches {
                TokenOutcome::Case(actual.to_string())
            } else {
                TokenOutcome::Correct
            };
        }
        match self.fuzzy.resolve(filename, assets) {
            Some(found) => TokenOutcome::Fuzzy(found.to_string()),
            None => TokenOutcome::Unresolved,
        }
    }
}

/// Token belongs to a `srcset`-style list rather than naming a file
fn is_width_descriptor(token: &str) -> bool {
    token.contains(char::is_whitespace) || token.ends_with('w')
}

/// Split list and CSS punctuation off the end of a captured token.
///
/// A `)` is only peeled while it is unbalanced, so `Logo(1).png` stays whole
/// while `url(images/Logo(1).png)` loses its closing paren.
fn split_trailing(token: &str) -> (&str, &str) {
    let mut end = token.len();
    loop {
        let bare = &token[..end];
        match bare.chars().last() {
            Some(',') | Some(';') => end -= 1,
            Some(')') if bare.matches(')').count() > bare.matches('(').count() => end -= 1,
            _ => break,
        }
    }
    token.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> ReferenceRewriter {
        ReferenceRewriter::new("images", FuzzyConfig::default(), &RewriteConfig::default()).unwrap()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn test_mapping_preserves_prefix() {
        let (out, stats) = rewriter().rewrite(
            r#"<img src="../images/Foo.png">"#,
            &map(&[("Foo.png", "foo.png")]),
            &set(&["foo.png"]),
        );
        assert_eq!(out, r#"<img src="../images/foo.png">"#);
        assert_eq!(stats.fixed_by_mapping, 1);
        assert!(stats.unresolved.is_empty());
    }

    #[test]
    fn test_prefix_depths_are_kept() {
        let text = "a images/Old_Name.jpg b ../images/Old_Name.jpg c ../../images/Old_Name.jpg";
        let (out, stats) = rewriter().rewrite(text, &map(&[("Old_Name.jpg", "old-name.jpg")]), &set(&[]));
        assert_eq!(
            out,
            "a images/old-name.jpg b ../images/old-name.jpg c ../../images/old-name.jpg"
        );
        assert_eq!(stats.fixed_by_mapping, 3);
    }

    #[test]
    fn test_width_descriptor_never_rewritten() {
        let text = r#"srcset="images/photo-500w, images/photo-800w""#;
        let (out, stats) = rewriter().rewrite(
            text,
            &map(&[("photo-500w", "x.png"), ("photo-500w,", "x.png"), ("photo-800w", "y.png")]),
            &set(&["photo.jpg"]),
        );
        assert_eq!(out, text);
        assert_eq!(stats.skipped_descriptors, 2);
        assert_eq!(stats.fixes(), 0);
    }

    #[test]
    fn test_css_url_reference_is_mapped() {
        let (out, stats) = rewriter().rewrite(
            r#"<div style="background:url(../images/Hero_Banner.png)">"#,
            &map(&[("Hero_Banner.png", "hero-banner.png")]),
            &set(&["hero-banner.png"]),
        );
        assert_eq!(out, r#"<div style="background:url(../images/hero-banner.png)">"#);
        assert_eq!(stats.fixed_by_mapping, 1);
        assert!(stats.unresolved.is_empty());
    }

    #[test]
    fn test_query_and_fragment_are_kept() {
        let (out, stats) = rewriter().rewrite(
            r#"<img src="images/Hero_Banner.png?v=2"><a href="images/Hero_Banner.png#top">"#,
            &map(&[("Hero_Banner.png", "hero-banner.png")]),
            &set(&["hero-banner.png"]),
        );
        assert_eq!(
            out,
            r#"<img src="images/hero-banner.png?v=2"><a href="images/hero-banner.png#top">"#
        );
        assert_eq!(stats.fixed_by_mapping, 2);
    }

    #[test]
    fn test_srcset_entries_with_trailing_comma() {
        let (out, stats) = rewriter().rewrite(
            r#"srcset="images/Hero_Banner.png, images/Hero_Banner.png 2x""#,
            &map(&[("Hero_Banner.png", "hero-banner.png")]),
            &set(&["hero-banner.png"]),
        );
        assert_eq!(out, r#"srcset="images/hero-banner.png, images/hero-banner.png 2x""#);
        assert_eq!(stats.fixed_by_mapping, 2);
        assert!(stats.unresolved.is_empty());
    }

    #[test]
    fn test_balanced_parens_stay_in_filename() {
        let (out, stats) = rewriter().rewrite(
            "url(images/Logo(1).png) images/Logo(1).png",
            &map(&[("Logo(1).png", "logo-1.png")]),
            &set(&["logo-1.png"]),
        );
        assert_eq!(out, "url(images/logo-1.png) images/logo-1.png");
        assert_eq!(stats.fixed_by_mapping, 2);
    }

    #[test]
    fn test_fuzzy_fix_and_unresolved() {
        let text = r#"<img src="images/About-Us---Image-1_1About-Us---Image-1.avif"><img src="images/missing.png">"#;
        let (out, stats) = rewriter().rewrite(text, &BTreeMap::new(), &set(&["about-us-image-1.avif"]));
        assert_eq!(
            out,
            r#"<img src="images/about-us-image-1.avif"><img src="images/missing.png">"#
        );
        assert_eq!(stats.fixed_by_fuzzy, 1);
        assert_eq!(stats.unresolved, vec!["missing.png"]);
    }

    #[test]
    fn test_case_mismatch_fixed_only_when_enabled() {
        let assets = set(&["logo.svg"]);
        let text = "images/LOGO.svg";

        let (out, _) = rewriter().rewrite(text, &BTreeMap::new(), &assets);
        assert_eq!(out, text);

        let fixing = ReferenceRewriter::new(
            "images",
            FuzzyConfig::default(),
            &RewriteConfig {
                fix_case_mismatches: true,
            },
        )
        .unwrap();
        let (out, stats) = fixing.rewrite(text, &BTreeMap::new(), &assets);
        assert_eq!(out, "images/logo.svg");
        assert_eq!(stats.fixed_case, 1);
    }

    #[test]
    fn test_rewrite_is_idempotent_on_fixed_text() {
        let assets = set(&["hero-banner.png"]);
        let mapping = map(&[("Hero_Banner.png", "hero-banner.png")]);
        let (once, _) = rewriter().rewrite("images/Hero_Banner.png", &mapping, &assets);
        let (twice, stats) = rewriter().rewrite(&once, &mapping, &assets);
        assert_eq!(once, twice);
        assert_eq!(stats.fixes(), 0);
        assert_eq!(stats.already_correct, 1);
    }

    #[test]
    fn test_other_directories_ignored() {
        let (out, stats) = rewriter().rewrite(
            r#"<link href="css/Site_Main.css">"#,
            &map(&[("Site_Main.css", "site-main.css")]),
            &set(&[]),
        );
        assert_eq!(out, r#"<link href="css/Site_Main.css">"#);
        assert_eq!(stats, RewriteStats::default());
    }
}
