//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use lookalike_core::{Catalog, ImageComparer, LocatorMounts, MatchConfig, MemoryCatalog};

use crate::config::{Config, REFERENCE_PREFIX, UPLOAD_PREFIX};

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Catalog every upload is written to and every comparison reads
    pub catalog: Arc<dyn Catalog>,
    /// Matching pipeline bound to `catalog`
    pub comparer: Arc<ImageComparer>,
    /// Where accepted uploads are stored
    pub upload_dir: PathBuf,
    /// URL prefix recorded in the locator of uploaded images
    pub upload_prefix: String,
    /// Maximum accepted image size in bytes
    pub max_file_size: usize,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        match_config: MatchConfig,
        config: &Config,
    ) -> lookalike_core::Result<Self> {
        let mounts = LocatorMounts::new()
            .mount(REFERENCE_PREFIX, &config.reference_dir)
            .mount(UPLOAD_PREFIX, &config.upload_dir);
        let comparer =
            ImageComparer::new(Arc::clone(&catalog), match_config)?.with_locator_mounts(mounts);
        Ok(Self {
            catalog,
            comparer: Arc::new(comparer),
            upload_dir: config.upload_dir.clone(),
            upload_prefix: UPLOAD_PREFIX.to_string(),
            max_file_size: config.max_file_size(),
        })
    }

    /// State over an empty in-memory catalog with default matching settings.
    pub fn in_memory(config: &Config) -> lookalike_core::Result<Self> {
        Self::new(Arc::new(MemoryCatalog::new()), config.match_config()?, config)
    }
}
