//! In-memory catalog.
//!
//! Used when no database is configured, by the CLI, and in tests. Entries live
//! for the lifetime of the process.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Catalog, CatalogEntry, NewCatalogEntry};
use crate::error::{LookalikeError, Result};
use crate::fingerprint::ImageHash;

#[derive(Default)]
struct Inner {
    /// Entries in insertion order
    entries: Vec<CatalogEntry>,
    /// Exact hash -> position in `entries`
    by_hash: HashMap<ImageHash, usize>,
}

/// Thread-safe in-memory catalog.
#[derive(Default)]
pub struct MemoryCatalog {
    inner: RwLock<Inner>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog pre-populated with existing entries.
    ///
    /// Later entries with a hash already seen are dropped.
    pub fn with_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut inner = Inner::default();
        for entry in entries {
            if inner.by_hash.contains_key(&entry.hash) {
                continue;
            }
            inner.by_hash.insert(entry.hash.clone(), inner.entries.len());
            inner.entries.push(entry);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find_all(&self) -> Result<Vec<CatalogEntry>> {
        Ok(self.inner.read().await.entries.clone())
    }

    async fn find_by_hash(&self, hash: &ImageHash) -> Result<Option<CatalogEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_hash
            .get(hash)
            .map(|&index| inner.entries[index].clone()))
    }

    async fn insert(&self, entry: NewCatalogEntry) -> Result<CatalogEntry> {
        let mut inner = self.inner.write().await;
        if inner.by_hash.contains_key(&entry.hash) {
            return Err(LookalikeError::DuplicateHash(entry.hash.to_string()));
        }

        let record = CatalogEntry {
            id: Uuid::new_v4(),
            hash: entry.hash,
            locator: entry.locator,
            created_at: Utc::now(),
        };

        let index = inner.entries.len();
        inner.by_hash.insert(record.hash.clone(), index);
        inner.entries.push(record.clone());

        tracing::debug!(locator = %record.locator, hash = %record.hash, "Stored catalog entry");

        Ok(record)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.read().await.entries.len())
    }
}
