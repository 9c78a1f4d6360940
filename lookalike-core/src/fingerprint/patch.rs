//! Patch hashing for region-based matching.
//!
//! A square window of `patch_size` pixels slides over the decoded image with
//! a fixed stride on both axes, row by row. Every crop is hashed with the same
//! pipeline as a whole image, so patch hashes compare directly against
//! catalog hashes.
//!
//! Hashing is lazy: [`PatchHashes`] computes one crop per `next()` call, so a
//! consumer that stops at the first hit never pays for the remaining patches.

use std::sync::Arc;

use image::{DynamicImage, GenericImageView};

use super::perceptual::{decode_image, HashExtractor, ImageHash};
use crate::error::{LookalikeError, Result};

/// Default crop side length in pixels.
pub const DEFAULT_PATCH_SIZE: u32 = 64;

/// Default stride between neighbouring crops in pixels.
pub const DEFAULT_PATCH_STEP: u32 = 16;

/// Window size and stride of the sliding crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchGeometry {
    patch_size: u32,
    step: u32,
}

impl Default for PatchGeometry {
    fn default() -> Self {
        Self {
            patch_size: DEFAULT_PATCH_SIZE,
            step: DEFAULT_PATCH_STEP,
        }
    }
}

impl PatchGeometry {
    /// Both values must be non-zero; a zero step would never advance.
    pub fn new(patch_size: u32, step: u32) -> Result<Self> {
        if patch_size == 0 {
            return Err(LookalikeError::InvalidConfig(
                "patch size must be greater than zero".into(),
            ));
        }
        if step == 0 {
            return Err(LookalikeError::InvalidConfig(
                "patch step must be greater than zero".into(),
            ));
        }
        Ok(Self { patch_size, step })
    }

    pub fn patch_size(&self) -> u32 {
        self.patch_size
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    /// Number of window positions along one axis of the given length.
    fn positions(&self, length: u32) -> usize {
        if length < self.patch_size {
            0
        } else {
            ((length - self.patch_size) / self.step) as usize + 1
        }
    }

    /// Total number of patches for an image of the given dimensions.
    pub fn patch_count(&self, width: u32, height: u32) -> usize {
        self.positions(width) * self.positions(height)
    }
}

/// Produces patch hash sequences for images.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchHashExtractor {
    hasher: HashExtractor,
    geometry: PatchGeometry,
}

impl PatchHashExtractor {
    pub fn new(geometry: PatchGeometry) -> Self {
        Self {
            hasher: HashExtractor::new(),
            geometry,
        }
    }

    pub fn geometry(&self) -> PatchGeometry {
        self.geometry
    }

    /// Decode the bytes and return the lazy patch hash sequence.
    ///
    /// Fails only when the bytes cannot be decoded. An image smaller than the
    /// patch size yields an empty sequence.
    pub fn extract_patches(&self, image_data: &[u8]) -> Result<PatchHashes> {
        let image = decode_image(image_data)?;
        Ok(self.patches_of(Arc::new(image)))
    }

    /// Patch hash sequence over an already decoded image.
    pub fn patches_of(&self, image: Arc<DynamicImage>) -> PatchHashes {
        let size = self.geometry.patch_size;
        self.windows_of(image, size, size)
    }

    /// Hash sequence of `width`×`height` windows sliding over the image with
    /// the configured step, in the same row-major order as square patches.
    ///
    /// Used to look for a smaller query inside a larger catalog image: the
    /// window at the query's location covers exactly the same pixels.
    pub fn windows_of(&self, image: Arc<DynamicImage>, width: u32, height: u32) -> PatchHashes {
        let (image_width, image_height) = image.dimensions();
        let step = self.geometry.step;
        let fits = width > 0 && height > 0 && width <= image_width && height <= image_height;
        let remaining = if fits {
            window_positions(image_width, width, step) * window_positions(image_height, height, step)
        } else {
            0
        };

        PatchHashes {
            image,
            hasher: self.hasher,
            window: (width, height),
            step,
            cursor: fits.then_some((0, 0)),
            remaining,
        }
    }
}

fn window_positions(length: u32, window: u32, step: u32) -> usize {
    ((length - window) / step) as usize + 1
}

/// Lazy, finite sequence of patch hashes in row-major order.
///
/// Cloning yields an independent iterator positioned at the same patch, so a
/// fresh sequence from [`PatchHashExtractor::patches_of`] can be replayed.
#[derive(Clone)]
pub struct PatchHashes {
    image: Arc<DynamicImage>,
    hasher: HashExtractor,
    window: (u32, u32),
    step: u32,
    cursor: Option<(u32, u32)>,
    remaining: usize,
}

impl PatchHashes {
    /// Top-left corner of the patch the next call to `next()` will hash.
    pub fn next_origin(&self) -> Option<(u32, u32)> {
        self.cursor
    }

    fn advance(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        let (width, height) = self.image.dimensions();
        let (window_width, window_height) = self.window;

        let fits = |pos: u32, size: u32, length: u32| {
            pos.checked_add(size)
                .map(|end| end <= length)
                .unwrap_or(false)
        };

        if let Some(nx) = x
            .checked_add(self.step)
            .filter(|&nx| fits(nx, window_width, width))
        {
            return Some((nx, y));
        }
        y.checked_add(self.step)
            .filter(|&ny| fits(ny, window_height, height))
            .map(|ny| (0, ny))
    }
}

impl Iterator for PatchHashes {
    type Item = ImageHash;

    fn next(&mut self) -> Option<ImageHash> {
        let (x, y) = self.cursor?;
        let (width, height) = self.window;

        let crop = self.image.crop_imm(x, y, width, height);
        let hash = self.hasher.hash_image(&crop);

        self.cursor = self.advance(x, y);
        self.remaining = self.remaining.saturating_sub(1);
        Some(hash)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for PatchHashes {}

impl std::fmt::Debug for PatchHashes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchHashes")
            .field("dimensions", &self.image.dimensions())
            .field("window", &self.window)
            .field("step", &self.step)
            .field("cursor", &self.cursor)
            .field("remaining", &self.remaining)
            .finish()
    }
}
