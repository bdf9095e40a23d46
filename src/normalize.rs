//! Filename Normalization
//!
//! Converts exported asset filenames (duplicated segments, content-hash
//! prefixes, mixed case, stray punctuation) into a canonical URL-safe form:
//!
//! ```text
//! About-Us---Image-1_1About-Us---Image-1.AVIF  ->  about-us-image-1.avif
//! 365cf3adf1b8ced6ecc57c70b839f820_Hero_Banner.png  ->  hero-banner.png
//! ```
//!
//! The pipeline is pure and idempotent. Which variant of the rules runs is
//! selected by a [`Ruleset`], so every pass states the rules it applied.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ReconcileError, Result};

/// Length of the hex content-hash prefix added by the export tool
const HASH_PREFIX_LEN: usize = 32;

// =============================================================================
// Ruleset
// =============================================================================

/// Versioned normalization rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Ruleset {
    /// First pass: one collapse sweep, separator runs folded to a hyphen
    V1,
    /// Second pass: collapse to fixed point, underscores replaced one by one
    #[default]
    V2,
}

impl Ruleset {
    /// Whether the duplicate collapser repeats until nothing changes
    pub fn collapse_to_fixed_point(self) -> bool {
        matches!(self, Ruleset::V2)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Ruleset::V1 => "v1",
            Ruleset::V2 => "v2",
        }
    }
}

impl fmt::Display for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ruleset {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "v1" => Ok(Ruleset::V1),
            "v2" => Ok(Ruleset::V2),
            _ => Err(ReconcileError::UnknownVariant {
                kind: "ruleset",
                value: s.to_string(),
            }),
        }
    }
}

// =============================================================================
// Normalizer
// =============================================================================

/// Applies a [`Ruleset`] to filenames
#[derive(Debug, Clone, Copy, Default)]
pub struct NameNormalizer {
    ruleset: Ruleset,
}

impl NameNormalizer {
    pub fn new(ruleset: Ruleset) -> Self {
        Self { ruleset }
    }

    pub fn ruleset(&self) -> Ruleset {
        self.ruleset
    }

    /// Canonical form of `filename`.
    ///
    /// Never fails. A base name made only of punctuation comes back empty
    /// (e.g. `"!!!.png"` -> `".png"`); see [`is_degenerate`].
    pub fn normalize(&self, filename: &str) -> String {
        let (base, ext) = split_filename(filename);

        let mut name = if self.ruleset.collapse_to_fixed_point() {
            collapse_duplicates_fixed(base)
        } else {
            collapse_duplicates(base)
        };

        name = strip_hash_prefix(&name).to_string();

        name = match self.ruleset {
            Ruleset::V1 => fold_separator_runs(&name),
            Ruleset::V2 => name.replace('_', "-"),
        };

        let name: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect();
        let name = squeeze_hyphens(&name).to_ascii_lowercase();
        let name = name.trim_matches('-');

        join_filename(name, &ext.to_lowercase())
    }
}

/// Normalize with the default ruleset
pub fn normalize(filename: &str) -> String {
    NameNormalizer::default().normalize(filename)
}

/// True when a normalized name has nothing left of its base name
pub fn is_degenerate(normalized: &str) -> bool {
    split_filename(normalized).0.is_empty()
}

/// Split at the last dot into `(base, extension)`; no dot means no extension
pub fn split_filename(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) => (&filename[..idx], &filename[idx + 1..]),
        None => (filename, ""),
    }
}

pub fn join_filename(base: &str, ext: &str) -> String {
    if ext.is_empty() {
        base.to_string()
    } else {
        format!("{}.{}", base, ext)
    }
}

// =============================================================================
// Duplicate pattern collapsing
// =============================================================================

/// One left-to-right sweep removing `X_1X` repetitions.
///
/// At each position the shortest `X` wins; the second copy is matched
/// case-insensitively and the first copy is kept verbatim.
pub fn collapse_duplicates(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;

    while i < n {
        match repeated_segment_len(&chars, i) {
            Some(len) => {
                out.extend(&chars[i..i + len]);
                i += 2 * len + 2;
            }
            None => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }
    out
}

/// Repeat [`collapse_duplicates`] until the name stops changing
pub fn collapse_duplicates_fixed(name: &str) -> String {
    let mut current = name.to_string();
    loop {
        let next = collapse_duplicates(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn repeated_segment_len(chars: &[char], start: usize) -> Option<usize> {
    let remaining = chars.len() - start;
    (1..)
        .take_while(|len| 2 * len + 2 <= remaining)
        .find(|&len| {
            let sep = start + len;
            chars[sep] == '_'
                && chars[sep + 1] == '1'
                && chars[start..sep]
                    .iter()
                    .zip(&chars[sep + 2..sep + 2 + len])
                    .all(|(a, b)| chars_eq_ignore_case(*a, *b))
        })
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

// =============================================================================
// Remaining pipeline steps
// =============================================================================

fn strip_hash_prefix(name: &str) -> &str {
    let bytes = name.as_bytes();
    let is_hash = bytes.len() > HASH_PREFIX_LEN
        && bytes[..HASH_PREFIX_LEN]
            .iter()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        && bytes[HASH_PREFIX_LEN] == b'_';
    if is_hash {
        &name[HASH_PREFIX_LEN + 1..]
    } else {
        name
    }
}

fn fold_separator_runs(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c == '-' || c == '_' {
            if !in_run {
                out.push('-');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

fn squeeze_hyphens(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_hyphen = false;
    for c in name.chars() {
        if c == '-' && prev_hyphen {
            continue;
        }
        prev_hyphen = c == '-';
        out.push(c);
    }
    out
}
