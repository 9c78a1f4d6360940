//! Reference catalog of indexed images.
//!
//! The catalog is the persistent corpus every query is compared against.
//! Matching only ever reads a snapshot of it; entries are written once, by
//! [`CatalogSync`] at startup or by upload acceptance.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use lookalike_core::catalog::{Catalog, CatalogSync, MemoryCatalog};
//!
//! # async fn example() -> lookalike_core::Result<()> {
//! let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
//! let report = CatalogSync::new(catalog.clone(), "/ourImages")
//!     .sync("ourImages")
//!     .await?;
//! println!("{} images indexed", report.inserted);
//! # Ok(())
//! # }
//! ```

mod locator;
mod memory;
mod sync;

pub use locator::LocatorMounts;
pub use memory::MemoryCatalog;
pub use sync::{CatalogSync, SyncReport, SUPPORTED_EXTENSIONS};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LookalikeError, Result};
use crate::fingerprint::ImageHash;

/// An indexed reference image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unique identifier
    pub id: Uuid,
    /// Perceptual hash of the image
    pub hash: ImageHash,
    /// Where the image can be fetched from (path or URL)
    pub locator: String,
    /// When the entry was indexed
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new catalog entry.
#[derive(Debug, Clone)]
pub struct NewCatalogEntry {
    pub hash: ImageHash,
    pub locator: String,
}

impl NewCatalogEntry {
    pub fn new(hash: ImageHash, locator: impl Into<String>) -> Self {
        Self {
            hash,
            locator: locator.into(),
        }
    }
}

/// Storage for catalog entries.
///
/// Implementations must be thread-safe (`Send + Sync`) and must serialize
/// their own writes. There is no fuzzy query: similarity search is always a
/// linear scan over [`Catalog::find_all`].
#[async_trait]
pub trait Catalog: Send + Sync {
    /// All entries, ordered by creation time then id.
    async fn find_all(&self) -> Result<Vec<CatalogEntry>>;

    /// Exact hash lookup, used for deduplication only.
    async fn find_by_hash(&self, hash: &ImageHash) -> Result<Option<CatalogEntry>>;

    /// Append a new entry.
    ///
    /// Returns [`LookalikeError::DuplicateHash`] when an entry with the same
    /// hash already exists.
    async fn insert(&self, entry: NewCatalogEntry) -> Result<CatalogEntry>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize>;
}

/// Check that every stored hash has the expected length.
///
/// Run at startup: a catalog holding hashes from a different configuration
/// cannot be compared against and must be rejected before serving.
pub fn validate_catalog(entries: &[CatalogEntry], expected_len: usize) -> Result<()> {
    match entries.iter().find(|e| e.hash.len() != expected_len) {
        Some(entry) => {
            tracing::error!(
                entry_id = %entry.id,
                locator = %entry.locator,
                expected = expected_len,
                actual = entry.hash.len(),
                "Catalog hash length does not match configuration"
            );
            Err(LookalikeError::HashLengthMismatch {
                expected: expected_len,
                actual: entry.hash.len(),
            })
        }
        None => Ok(()),
    }
}
