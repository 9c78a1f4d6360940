//! Mapping from catalog locators back to files on disk.

use std::path::{Component, Path, PathBuf};

/// Public locator prefixes mounted on local directories.
///
/// A locator such as `/ourImages/cat.png` resolves against the directory
/// mounted at `/ourImages`. Locators outside every mount are taken as plain
/// filesystem paths, which is what the CLI stores.
#[derive(Debug, Clone, Default)]
pub struct LocatorMounts {
    mounts: Vec<(String, PathBuf)>,
}

impl LocatorMounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve locators starting with `prefix` from `directory`.
    pub fn mount(mut self, prefix: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        let prefix = prefix.into().trim_end_matches('/').to_string();
        self.mounts.push((prefix, directory.into()));
        self
    }

    /// File backing `locator`, or `None` when the locator escapes its mount.
    pub fn resolve(&self, locator: &str) -> Option<PathBuf> {
        for (prefix, directory) in &self.mounts {
            let Some(rest) = locator.strip_prefix(prefix.as_str()) else {
                continue;
            };
            let Some(relative) = rest.strip_prefix('/') else {
                continue;
            };
            let relative = Path::new(relative);
            if !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
            {
                return None;
            }
            return Some(directory.join(relative));
        }
        Some(PathBuf::from(locator))
    }
}
