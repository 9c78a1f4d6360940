//! Lookalike Core - perceptual-hash image matching engine
//!
//! This crate finds images in a reference catalog that match, closely
//! resemble, or partially contain a query image.
//!
//! # Features
//!
//! - Block-mean-value perceptual hashing (64×64 grayscale, 16×16 grid)
//! - Tiered classification: exact, similar, partial, none
//! - Bounded-concurrency whole-image search with an exact-match fast path
//! - Sliding-window crop fallback for region matches
//! - Catalog sync from a reference directory, deduplicated by hash
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lookalike_core::{Catalog, CatalogSync, ImageComparer, MatchConfig, MemoryCatalog};
//!
//! # async fn example() -> lookalike_core::Result<()> {
//! let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
//! CatalogSync::new(catalog.clone(), "/ourImages").sync("ourImages").await?;
//!
//! let comparer = ImageComparer::new(catalog, MatchConfig::default())?;
//! let comparison = comparer.compare(std::fs::read("query.jpg")?).await?;
//!
//! println!("tier: {}", comparison.outcome.tier());
//! for result in comparison.outcome.results() {
//!     println!("{} {:.2}%", result.locator, result.similarity);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod matching;

// Re-export main types for convenience
pub use catalog::{
    validate_catalog, Catalog, CatalogEntry, CatalogSync, LocatorMounts, MemoryCatalog,
    NewCatalogEntry, SyncReport,
};
pub use config::{MatchConfig, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_SIMILAR_THRESHOLD};
pub use error::{LookalikeError, Result};
pub use fingerprint::{
    hamming_distance, HashExtractor, ImageHash, PatchGeometry, PatchHashExtractor, HASH_SYMBOLS,
};
pub use matching::{
    classify, similarity, Comparison, ImageComparer, MatchOutcome, MatchResult, Matcher,
    PartialMatcher, Tier, PARTIAL_MATCH_NOTE,
};
