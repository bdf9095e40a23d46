//! Collision Resolution
//!
//! Turns a [`MappingReport`] into an ordered list of [`Decision`]s. This is
//! the "decide" half of a pass: nothing here touches the filesystem, and
//! the decisions are complete before [`crate::store::apply`] runs any of them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{ReconcileError, Result};
use crate::mapping::{Collision, MappingReport};

/// How colliding originals are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Leave every contributor untouched and report the collision
    #[default]
    SkipAndWarn,
    /// Keep one contributor under the canonical name, delete the rest
    DeleteDuplicates,
}

impl CollisionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            CollisionPolicy::SkipAndWarn => "skip-and-warn",
            CollisionPolicy::DeleteDuplicates => "delete-duplicates",
        }
    }
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollisionPolicy {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "skip-and-warn" | "skip" => Ok(CollisionPolicy::SkipAndWarn),
            "delete-duplicates" | "delete" => Ok(CollisionPolicy::DeleteDuplicates),
            _ => Err(ReconcileError::UnknownVariant {
                kind: "collision policy",
                value: s.to_string(),
            }),
        }
    }
}

/// One planned filesystem action, or a reported non-action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    Rename {
        from: String,
        to: String,
        /// Case-only change: go through a temporary name so that
        /// case-insensitive filesystems actually perform it
        via_temp: bool,
    },
    Delete {
        file: String,
        /// Contributor that keeps the canonical name
        survivor: String,
        canonical: String,
    },
    Unresolved {
        canonical: String,
        contributors: Vec<String>,
    },
}

impl Decision {
    pub fn rename(from: &str, to: &str) -> Self {
        Decision::Rename {
            from: from.to_string(),
            to: to.to_string(),
            via_temp: is_case_only_change(from, to),
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, Decision::Delete { .. })
    }
}

/// `from` and `to` differ, but only by letter case
pub fn is_case_only_change(from: &str, to: &str) -> bool {
    from != to && from.to_lowercase() == to.to_lowercase()
}

/// Applies a [`CollisionPolicy`] to a mapping
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionResolver {
    policy: CollisionPolicy,
}

impl CollisionResolver {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// Decide what happens to every mapped or colliding original.
    ///
    /// Order is the order of application: deletions, then renames sorted by
    /// source name, then unresolved collisions.
    pub fn resolve(&self, report: &MappingReport) -> Vec<Decision> {
        let colliding = report.colliding_originals();

        let mut deletes = Vec::new();
        let mut renames: Vec<Decision> = report
            .mapping
            .iter()
            .filter(|(old, _)| !colliding.contains(old.as_str()))
            .map(|(old, new)| Decision::rename(old, new))
            .collect();
        let mut unresolved = Vec::new();

        for collision in &report.collisions {
            match self.policy {
                CollisionPolicy::SkipAndWarn => {
                    debug!(canonical = %collision.canonical, "leaving collision unresolved");
                    unresolved.push(Decision::Unresolved {
                        canonical: collision.canonical.clone(),
                        contributors: collision.contributors.clone(),
                    });
                }
                CollisionPolicy::DeleteDuplicates => {
                    let survivor = pick_survivor(collision);
                    if survivor != collision.canonical {
                        renames.push(Decision::rename(survivor, &collision.canonical));
                    }
                    for contributor in &collision.contributors {
                        if contributor == survivor {
                            continue;
                        }
                        debug!(file = %contributor, survivor = %survivor, "planning duplicate deletion");
                        deletes.push(Decision::Delete {
                            file: contributor.clone(),
                            survivor: survivor.to_string(),
                            canonical: collision.canonical.clone(),
                        });
                    }
                }
            }
        }

        renames.sort_by(|a, b| rename_source(a).cmp(rename_source(b)));

        let mut decisions = deletes;
        decisions.extend(renames);
        decisions.extend(unresolved);
        decisions
    }
}

/// The contributor already holding the canonical name, else the first sorted one
fn pick_survivor(collision: &Collision) -> &str {
    collision
        .in_place()
        .or_else(|| collision.contributors.first().map(String::as_str))
        .unwrap_or(collision.canonical.as_str())
}

fn rename_source(decision: &Decision) -> &str {
    match decision {
        Decision::Rename { from, .. } => from,
        _ => "",
    }
}
