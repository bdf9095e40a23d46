//! Fuzzy Reference Resolution
//!
//! Finds the asset a stale reference most likely meant. Only used when the
//! reference matches nothing exactly and is not a mapping key.
//!
//! A candidate qualifies when, after stripping everything but ASCII
//! alphanumerics and lowercasing both base names:
//! - one contains the other,
//! - both are longer than `min_clean_len`,
//! - their character-set similarity exceeds `similarity_threshold`.
//!
//! Candidates are tried in lexicographic order so the first qualifying one
//! is the same on every run.

use std::collections::BTreeSet;

use crate::config::FuzzyConfig;
use crate::normalize::split_filename;

#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyResolver {
    config: FuzzyConfig,
}

impl FuzzyResolver {
    pub fn new(config: FuzzyConfig) -> Self {
        Self { config }
    }

    /// Best matching asset for `reference`, or `None` when nothing qualifies
    pub fn resolve<'a>(&self, reference: &str, assets: &'a BTreeSet<String>) -> Option<&'a str> {
        if let Some(exact) = find_case_insensitive(reference, assets) {
            return Some(exact);
        }

        let (ref_base, ref_ext) = split_filename(reference);
        let ref_clean = clean(ref_base);

        assets
            .iter()
            .filter(|candidate| {
                let (_, ext) = split_filename(candidate);
                ext.eq_ignore_ascii_case(ref_ext)
            })
            .find(|candidate| {
                let (base, _) = split_filename(candidate);
                self.accepts(&ref_clean, &clean(base))
            })
            .map(String::as_str)
    }

    /// Whether two cleaned base names are close enough
    pub fn accepts(&self, a: &str, b: &str) -> bool {
        let contained = a.contains(b) || b.contains(a);
        let long_enough = a.len() > self.config.min_clean_len && b.len() > self.config.min_clean_len;
        contained && long_enough && similarity(a, b) > self.config.similarity_threshold
    }
}

/// Asset equal to `name` ignoring case, first in sorted order
pub fn find_case_insensitive<'a>(name: &str, assets: &'a BTreeSet<String>) -> Option<&'a str> {
    let lower = name.to_lowercase();
    assets
        .iter()
        .find(|asset| asset.to_lowercase() == lower)
        .map(String::as_str)
}

/// Lowercased ASCII alphanumerics of `name`
pub fn clean(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Shared distinct characters over the larger distinct-character count.
///
/// Symmetric, in `[0, 1]`; two empty strings score 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<char> = a.chars().collect();
    let set_b: BTreeSet<char> = b.chars().collect();
    let larger = set_a.len().max(set_b.len());
    if larger == 0 {
        return 0.0;
    }
    set_a.intersection(&set_b).count() as f64 / larger as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_case_insensitive_match_first() {
        let set = assets(&["hero.png", "hero-banner.png"]);
        assert_eq!(FuzzyResolver::default().resolve("HERO.PNG", &set), Some("hero.png"));
    }

    #[test]
    fn test_duplicated_reference_resolves() {
        let set = assets(&["about-us-image-1.avif", "contact.avif"]);
        assert_eq!(
            FuzzyResolver::default().resolve("About-Us---Image-1_1About-Us---Image-1.avif", &set),
            Some("about-us-image-1.avif")
        );
    }

    #[test]
    fn test_extension_must_match() {
        let set = assets(&["about-us-image-1.webp"]);
        assert_eq!(
            FuzzyResolver::default().resolve("About-Us-Image-1_1About-Us-Image-1.avif", &set),
            None
        );
    }

    #[test]
    fn test_short_tokens_never_match() {
        let set = assets(&["image-large.png", "logo.png"]);
        let resolver = FuzzyResolver::default();
        // "image" is contained in "imagelarge" but is only five characters
        assert_eq!(resolver.resolve("image.png", &set), None);
        assert_eq!(resolver.resolve("logo_1.png", &set), None);
    }

    #[test]
    fn test_low_similarity_rejected() {
        let set = assets(&["team-photo-with-everyone-xyz.jpg"]);
        // contained, long enough, but too few shared characters
        assert_eq!(FuzzyResolver::default().resolve("teamph.jpg", &set), None);
    }

    #[test]
    fn test_first_sorted_candidate_wins() {
        let set = assets(&["gallery-shot-b.jpg", "gallery-shot-a.jpg"]);
        assert_eq!(
            FuzzyResolver::default().resolve("Gallery_Shot.jpg", &set),
            Some("gallery-shot-a.jpg")
        );
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let set = assets(&["teamphoto.jpg"]);
        let strict = FuzzyResolver::new(FuzzyConfig {
            min_clean_len: 5,
            similarity_threshold: 0.95,
        });
        let loose = FuzzyResolver::default();
        assert_eq!(strict.resolve("team-photos.jpg", &set), None);
        assert_eq!(loose.resolve("team-photos.jpg", &set), Some("teamphoto.jpg"));
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let pairs = [
            ("aboutusimage1", "aboutusimage11aboutusimage1"),
            ("teamph", "teamphotowitheveryonexyz"),
            ("", "abc"),
            ("xyz", "abc"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a));
        }
        assert_eq!(similarity("abc", "cab"), 1.0);
        assert_eq!(similarity("", ""), 0.0);
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean("About-Us---Image-1_1"), "aboutusimage11");
        assert_eq!(clean("Café!"), "caf");
    }
}
