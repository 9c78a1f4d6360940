//! Region-based fallback matching.

use tracing::{debug, trace};

use super::{similarity, MatchResult};
use crate::catalog::CatalogEntry;
use crate::fingerprint::{hamming_distance, ImageHash};

/// Region search between a query and catalog images, in both directions.
///
/// [`PartialMatcher::match_partial`] looks for a catalog image inside the
/// query: query patches are visited in the order they are produced and, for
/// each patch, entries in snapshot order. [`PartialMatcher::match_region`]
/// looks for the query inside one catalog image, window by window. In both
/// cases the first pair at or above the threshold wins and nothing further is
/// hashed or compared, so the result is deterministic.
#[derive(Debug, Clone, Copy)]
pub struct PartialMatcher {
    threshold: f64,
}

impl PartialMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn match_partial<I>(&self, patches: I, snapshot: &[CatalogEntry]) -> Option<MatchResult>
    where
        I: IntoIterator<Item = ImageHash>,
    {
        if snapshot.is_empty() {
            return None;
        }

        for (patch_index, patch) in patches.into_iter().enumerate() {
            for entry in snapshot {
                let Ok(distance) = hamming_distance(&patch, &entry.hash) else {
                    trace!(locator = %entry.locator, "Patch hash length differs from entry");
                    continue;
                };
                let score = similarity(distance, patch.len());
                if score >= self.threshold {
                    debug!(
                        patch = patch_index,
                        locator = %entry.locator,
                        similarity = score,
                        "Partial match found"
                    );
                    return Some(MatchResult::partial(&entry.locator, score));
                }
            }
        }

        None
    }

    /// Find the query inside a catalog image.
    ///
    /// `windows` are hashes of query-sized regions of the catalog image.
    /// Returns the similarity of the first region at or above the threshold.
    pub fn match_region<I>(&self, query: &ImageHash, windows: I) -> Option<f64>
    where
        I: IntoIterator<Item = ImageHash>,
    {
        for (window_index, window) in windows.into_iter().enumerate() {
            let Ok(distance) = hamming_distance(query, &window) else {
                return None;
            };
            let score = similarity(distance, query.len());
            if score >= self.threshold {
                debug!(window = window_index, similarity = score, "Region match found");
                return Some(score);
            }
        }
        None
    }
}
