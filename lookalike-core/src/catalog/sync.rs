//! Reference directory ingestion.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{Catalog, NewCatalogEntry};
use crate::error::{LookalikeError, Result};
use crate::fingerprint::HashExtractor;

/// File extensions picked up by a sync (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Counters for one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Image files found in the directory
    pub scanned: usize,
    /// New entries written to the catalog
    pub inserted: usize,
    /// Files whose hash was already present
    pub duplicates: usize,
    /// Files that could not be read or decoded
    pub failed: usize,
}

enum FileOutcome {
    Inserted,
    Duplicate,
}

/// Ingests a directory of reference images into a catalog.
///
/// Deduplication is by exact hash equality, so running a sync twice over an
/// unchanged directory inserts nothing the second time.
pub struct CatalogSync {
    catalog: Arc<dyn Catalog>,
    extractor: HashExtractor,
    locator_prefix: String,
}

impl CatalogSync {
    /// `locator_prefix` is prepended to each file name to form the entry
    /// locator (e.g. `/ourImages` gives `/ourImages/cat.png`). An empty
    /// prefix stores the file path instead.
    pub fn new(catalog: Arc<dyn Catalog>, locator_prefix: impl Into<String>) -> Self {
        Self {
            catalog,
            extractor: HashExtractor::new(),
            locator_prefix: locator_prefix.into(),
        }
    }

    fn locator_for(&self, directory: &Path, file_name: &str) -> String {
        if self.locator_prefix.is_empty() {
            directory.join(file_name).display().to_string()
        } else {
            format!("{}/{}", self.locator_prefix.trim_end_matches('/'), file_name)
        }
    }

    /// Index every supported image in `directory`.
    ///
    /// Only a missing or unreadable directory fails the whole run; per-file
    /// failures are logged and counted in the report.
    pub async fn sync(&self, directory: impl AsRef<Path>) -> Result<SyncReport> {
        let directory = directory.as_ref();
        let mut report = SyncReport::default();

        let mut names = Vec::new();
        let mut listing = tokio::fs::read_dir(directory).await?;
        while let Some(item) = listing.next_entry().await? {
            let is_file = tokio::fs::metadata(item.path())
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            match item.file_name().into_string() {
                Ok(name) if has_supported_extension(&name) => names.push(name),
                Ok(name) => debug!(file = %name, "Skipping unsupported file"),
                Err(raw) => warn!(file = ?raw, "Skipping file with non UTF-8 name"),
            }
        }
        names.sort();

        for name in names {
            report.scanned += 1;
            match self.sync_file(directory, &name).await {
                Ok(FileOutcome::Inserted) => {
                    report.inserted += 1;
                    info!(file = %name, "Synced reference image");
                }
                Ok(FileOutcome::Duplicate) => {
                    report.duplicates += 1;
                    debug!(file = %name, "Reference image already in catalog");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(file = %name, error = %e, "Failed to sync reference image");
                }
            }
        }

        info!(
            directory = %directory.display(),
            scanned = report.scanned,
            inserted = report.inserted,
            duplicates = report.duplicates,
            failed = report.failed,
            "Catalog sync complete"
        );

        Ok(report)
    }

    async fn sync_file(&self, directory: &Path, file_name: &str) -> Result<FileOutcome> {
        let locator = self.locator_for(directory, file_name);

        let bytes = tokio::fs::read(directory.join(file_name))
            .await
            .map_err(|e| LookalikeError::EntryUnavailable {
                locator: locator.clone(),
                reason: e.to_string(),
            })?;

        let extractor = self.extractor;
        let hash = tokio::task::spawn_blocking(move || extractor.extract(&bytes)).await??;

        if self.catalog.find_by_hash(&hash).await?.is_some() {
            return Ok(FileOutcome::Duplicate);
        }

        match self.catalog.insert(NewCatalogEntry::new(hash, locator)).await {
            Ok(_) => Ok(FileOutcome::Inserted),
            // Lost a race against a concurrent upload of the same image
            Err(LookalikeError::DuplicateHash(_)) => Ok(FileOutcome::Duplicate),
            Err(e) => Err(e),
        }
    }
}

fn has_supported_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_supported_extension() {
        assert!(has_supported_extension("cat.png"));
        assert!(has_supported_extension("cat.JPG"));
        assert!(has_supported_extension("cat.jpeg"));
        assert!(!has_supported_extension("cat.gif"));
        assert!(!has_supported_extension("notes.txt"));
        assert!(!has_supported_extension("png"));
    }

    #[test]
    fn test_locator_for() {
        let catalog: Arc<dyn Catalog> = Arc::new(super::super::MemoryCatalog::new());
        let dir = Path::new("ourImages");

        let sync = CatalogSync::new(catalog.clone(), "/ourImages/");
        assert_eq!(sync.locator_for(dir, "a.png"), "/ourImages/a.png");

        let sync = CatalogSync::new(catalog, "");
        assert_eq!(
            sync.locator_for(dir, "a.png"),
            Path::new("ourImages").join("a.png").display().to_string()
        );
    }
}
