//! Matching configuration.

use crate::error::{LookalikeError, Result};
use crate::fingerprint::patch::PatchGeometry;

/// Minimum similarity (percent) for a `similar` or `partial` match.
pub const DEFAULT_SIMILAR_THRESHOLD: f64 = 70.0;

/// Default number of comparison tasks allowed to run at once.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 5;

/// Tunables of the matching engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfig {
    /// Similarity percentage in `[0, 100]` at or above which a non-exact
    /// comparison counts as a match
    pub similar_threshold: f64,
    /// Maximum concurrently running comparison tasks (at least 1)
    pub concurrency_limit: usize,
    /// Crop window used by the partial-match fallback
    pub patch: PatchGeometry,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            similar_threshold: DEFAULT_SIMILAR_THRESHOLD,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            patch: PatchGeometry::default(),
        }
    }
}

impl MatchConfig {
    /// Build and validate a configuration.
    pub fn new(
        similar_threshold: f64,
        concurrency_limit: usize,
        patch_size: u32,
        patch_step: u32,
    ) -> Result<Self> {
        let config = Self {
            similar_threshold,
            concurrency_limit,
            patch: PatchGeometry::new(patch_size, patch_step)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.similar_threshold.is_finite()
            || !(0.0..=100.0).contains(&self.similar_threshold)
        {
            return Err(LookalikeError::InvalidConfig(format!(
                "similarity threshold must be within 0..=100, got {}",
                self.similar_threshold
            )));
        }
        if self.concurrency_limit == 0 {
            return Err(LookalikeError::InvalidConfig(
                "concurrency limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn with_threshold(mut self, similar_threshold: f64) -> Self {
        self.similar_threshold = similar_threshold;
        self
    }

    pub fn with_concurrency_limit(mut self, concurrency_limit: usize) -> Self {
        self.concurrency_limit = concurrency_limit;
        self
    }
}
