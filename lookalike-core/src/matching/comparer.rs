//! End-to-end comparison of a query image against a catalog.

use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info, warn};

use super::{MatchOutcome, MatchResult, Matcher, PartialMatcher};
use crate::catalog::{Catalog, CatalogEntry, LocatorMounts};
use crate::config::MatchConfig;
use crate::error::{LookalikeError, Result};
use crate::fingerprint::{decode_image, HashExtractor, ImageHash, PatchHashExtractor};

/// Result of [`ImageComparer::compare`].
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Whole-image hash of the query
    pub query_hash: ImageHash,
    pub outcome: MatchOutcome,
}

/// Runs the full matching pipeline for query images.
///
/// The query is decoded and hashed once on the blocking pool. The catalog is
/// read once per call; that snapshot feeds both the whole-image search and,
/// when it finds nothing, the crop fallback.
///
/// The fallback runs two passes and stops at the first hit:
///
/// 1. Query crops against catalog hashes, for a catalog image contained in
///    the query.
/// 2. Query-sized windows of each catalog image against the query hash, for
///    a query cropped out of a catalog image. Catalog files are found through
///    [`LocatorMounts`]; entries whose file is missing or unreadable are
///    logged and skipped.
pub struct ImageComparer {
    catalog: Arc<dyn Catalog>,
    config: MatchConfig,
    extractor: HashExtractor,
    patches: PatchHashExtractor,
    matcher: Matcher,
    partial: PartialMatcher,
    mounts: Arc<LocatorMounts>,
}

impl ImageComparer {
    pub fn new(catalog: Arc<dyn Catalog>, config: MatchConfig) -> Result<Self> {
        let matcher = Matcher::new(&config)?;
        Ok(Self {
            catalog,
            config,
            extractor: HashExtractor::new(),
            patches: PatchHashExtractor::new(config.patch),
            matcher,
            partial: PartialMatcher::new(config.similar_threshold),
            mounts: Arc::new(LocatorMounts::new()),
        })
    }

    /// Resolve catalog locators through `mounts` when reading catalog files.
    pub fn with_locator_mounts(mut self, mounts: LocatorMounts) -> Self {
        self.mounts = Arc::new(mounts);
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Hash image bytes without touching the catalog.
    pub async fn fingerprint(&self, image_data: Vec<u8>) -> Result<ImageHash> {
        let extractor = self.extractor;
        tokio::task::spawn_blocking(move || extractor.extract(&image_data)).await?
    }

    /// Compare image bytes against the current catalog.
    ///
    /// Fails on undecodable input or catalog errors. An empty catalog or a
    /// query with no match is a successful [`MatchOutcome::None`].
    pub async fn compare(&self, image_data: Vec<u8>) -> Result<Comparison> {
        let extractor = self.extractor;
        let (image, query_hash) = tokio::task::spawn_blocking(move || {
            let image = decode_image(&image_data)?;
            let hash = extractor.hash_image(&image);
            Ok::<_, LookalikeError>((Arc::new(image), hash))
        })
        .await??;

        let snapshot: Arc<[CatalogEntry]> = self.catalog.find_all().await?.into();
        debug!(query_hash = %query_hash, entries = snapshot.len(), "Comparing query image");

        let mut outcome = self.matcher.find_matches(&query_hash, Arc::clone(&snapshot)).await;

        if !outcome.is_match() && !snapshot.is_empty() {
            if let Some(result) = self.crop_fallback(image, &query_hash, snapshot).await? {
                outcome = MatchOutcome::Partial(result);
            }
        }

        info!(
            query_hash = %query_hash,
            tier = %outcome.tier(),
            results = outcome.results().len(),
            "Comparison complete"
        );

        Ok(Comparison {
            query_hash,
            outcome,
        })
    }

    async fn crop_fallback(
        &self,
        image: Arc<DynamicImage>,
        query_hash: &ImageHash,
        snapshot: Arc<[CatalogEntry]>,
    ) -> Result<Option<MatchResult>> {
        let (width, height) = image.dimensions();
        let patches = self.patches.patches_of(image);
        let patch_count = patches.len();
        let partial = self.partial;
        let entries = Arc::clone(&snapshot);
        let found =
            tokio::task::spawn_blocking(move || partial.match_partial(patches, &entries)).await?;
        debug!(patches = patch_count, found = found.is_some(), "Query crop pass finished");
        if found.is_some() {
            return Ok(found);
        }

        let windows = self.patches;
        let mounts = Arc::clone(&self.mounts);
        let query = query_hash.clone();
        let found = tokio::task::spawn_blocking(move || {
            find_in_entries(&snapshot, &mounts, windows, partial, &query, (width, height))
        })
        .await?;
        debug!(found = found.is_some(), "Catalog window pass finished");
        Ok(found)
    }
}

/// Slide a query-sized window over each catalog image in snapshot order.
fn find_in_entries(
    snapshot: &[CatalogEntry],
    mounts: &LocatorMounts,
    windows: PatchHashExtractor,
    partial: PartialMatcher,
    query: &ImageHash,
    (width, height): (u32, u32),
) -> Option<MatchResult> {
    for entry in snapshot {
        if entry.hash.len() != query.len() {
            continue;
        }
        let image = match load_entry(entry, mounts) {
            Ok(image) => image,
            Err(e) => {
                warn!(locator = %entry.locator, error = %e, "Skipping catalog entry");
                continue;
            }
        };
        let regions = windows.windows_of(Arc::new(image), width, height);
        if let Some(score) = partial.match_region(query, regions) {
            debug!(locator = %entry.locator, similarity = score, "Query found inside catalog image");
            return Some(MatchResult::partial(&entry.locator, score));
        }
    }
    None
}

fn load_entry(entry: &CatalogEntry, mounts: &LocatorMounts) -> Result<DynamicImage> {
    let unavailable = |reason: String| LookalikeError::EntryUnavailable {
        locator: entry.locator.clone(),
        reason,
    };
    let path = mounts
        .resolve(&entry.locator)
        .ok_or_else(|| unavailable("locator escapes its directory".into()))?;
    let bytes = std::fs::read(&path).map_err(|e| unavailable(e.to_string()))?;
    decode_image(&bytes).map_err(|e| unavailable(e.to_string()))
}
