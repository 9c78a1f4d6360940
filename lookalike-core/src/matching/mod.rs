//! Tiered similarity matching.
//!
//! A query is compared against a catalog snapshot in two stages:
//!
//! 1. [`Matcher`] compares the whole-image hash against every entry with
//!    bounded parallelism. A distance of zero is an `exact` match and ends
//!    the search; anything at or above the similarity threshold is `similar`.
//! 2. When nothing qualified, [`PartialMatcher`] compares crop hashes of the
//!    query against the snapshot and reports the first qualifying pair as a
//!    `partial` match.
//!
//! [`ImageComparer`] wires both stages to a [`Catalog`](crate::catalog::Catalog).

mod comparer;
mod matcher;
mod partial;

pub use comparer::{Comparison, ImageComparer};
pub use matcher::{ConcurrencyGauge, Matcher};
pub use partial::PartialMatcher;

use serde::{Deserialize, Serialize};

/// Note attached to every partial match.
pub const PARTIAL_MATCH_NOTE: &str = "This match is based on a cropped region of the uploaded image";

/// Classification bucket of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Exact,
    Similar,
    Partial,
    None,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Exact => "exact",
            Tier::Similar => "similar",
            Tier::Partial => "partial",
            Tier::None => "none",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Similarity percentage for a Hamming distance over hashes of length `len`.
///
/// `(len - distance) / len * 100`, clamped at 0 when the distance exceeds
/// the length. A zero-length hash has no meaningful similarity and yields 0.
pub fn similarity(distance: u32, len: usize) -> f64 {
    if len == 0 {
        return 0.0;
    }
    let len = len as f64;
    let distance = (distance as f64).min(len);
    (len - distance) / len * 100.0
}

/// Whole-image tier for a distance.
///
/// Only `Exact`, `Similar` or `None` are returned; `Partial` comes from the
/// crop fallback.
pub fn classify(distance: u32, len: usize, threshold: f64) -> Tier {
    if distance == 0 {
        Tier::Exact
    } else if similarity(distance, len) >= threshold {
        Tier::Similar
    } else {
        Tier::None
    }
}

/// One reported match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Locator of the matching catalog entry
    pub locator: String,
    /// Similarity percentage in `[0, 100]`
    pub similarity: f64,
    pub tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl MatchResult {
    pub fn exact(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            similarity: 100.0,
            tier: Tier::Exact,
            note: None,
        }
    }

    pub fn similar(locator: impl Into<String>, similarity: f64) -> Self {
        Self {
            locator: locator.into(),
            similarity,
            tier: Tier::Similar,
            note: None,
        }
    }

    pub fn partial(locator: impl Into<String>, similarity: f64) -> Self {
        Self {
            locator: locator.into(),
            similarity,
            tier: Tier::Partial,
            note: Some(PARTIAL_MATCH_NOTE.to_string()),
        }
    }
}

/// Outcome of comparing one query against a catalog snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A catalog entry hashes identically to the query
    Exact(MatchResult),
    /// Every entry at or above the threshold, best first
    Similar(Vec<MatchResult>),
    /// First crop of the query that matched an entry
    Partial(MatchResult),
    None,
}

impl MatchOutcome {
    pub fn tier(&self) -> Tier {
        match self {
            MatchOutcome::Exact(_) => Tier::Exact,
            MatchOutcome::Similar(_) => Tier::Similar,
            MatchOutcome::Partial(_) => Tier::Partial,
            MatchOutcome::None => Tier::None,
        }
    }

    /// Reported results; empty for `None`.
    pub fn results(&self) -> &[MatchResult] {
        match self {
            MatchOutcome::Exact(result) | MatchOutcome::Partial(result) => {
                std::slice::from_ref(result)
            }
            MatchOutcome::Similar(results) => results,
            MatchOutcome::None => &[],
        }
    }

    pub fn into_results(self) -> Vec<MatchResult> {
        match self {
            MatchOutcome::Exact(result) | MatchOutcome::Partial(result) => vec![result],
            MatchOutcome::Similar(results) => results,
            MatchOutcome::None => Vec::new(),
        }
    }

    pub fn is_match(&self) -> bool {
        !matches!(self, MatchOutcome::None)
    }
}
