//! Perceptual hashing for images.
//!
//! # Algorithm
//!
//! Every image goes through the same pipeline so that whole-image hashes,
//! patch hashes and stored catalog hashes are directly comparable:
//!
//! 1. decode the raster (JPEG, PNG, GIF or WebP)
//! 2. resize to exactly 64×64
//! 3. convert to grayscale
//! 4. block-mean-value hash over a 16×16 grid (Blockhash, 256 bits)
//!
//! The 256 bits are rendered as 64 lowercase hex symbols. Distances are
//! counted in hex symbols, so a hash has length L = 64.
//!
//! # Usage
//!
//! ```no_run
//! use lookalike_core::fingerprint::{hamming_distance, HashExtractor};
//!
//! let extractor = HashExtractor::new();
//! let a = extractor.extract(&std::fs::read("a.png").unwrap()).unwrap();
//! let b = extractor.extract(&std::fs::read("b.png").unwrap()).unwrap();
//! let distance = hamming_distance(&a, &b).unwrap();
//! println!("{} of {} symbols differ", distance, a.len());
//! ```

use std::fmt;
use std::str::FromStr;

use blockhash::{blockhash256, Blockhash256};
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::{LookalikeError, Result};

/// Side length of the square the image is resized to before hashing.
pub const HASH_INPUT_SIZE: u32 = 64;

/// Number of blocks per side of the hashing grid.
pub const HASH_GRID_SIZE: u32 = 16;

/// Hash length in hex symbols (16×16 bits = 256 bits = 64 hex symbols).
pub const HASH_SYMBOLS: usize = (HASH_GRID_SIZE * HASH_GRID_SIZE / 4) as usize;

/// A perceptual hash rendered as a fixed-length lowercase hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageHash(String);

impl ImageHash {
    /// Build a hash from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parse a hash from its hex representation.
    ///
    /// Accepts upper or lower case; the stored form is always lower case.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let trimmed = hex_str.trim();
        if trimmed.is_empty() {
            return Err(LookalikeError::InvalidHash("hash is empty".into()));
        }
        if let Some(bad) = trimmed.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(LookalikeError::InvalidHash(format!(
                "unexpected character {:?} in {}",
                bad, trimmed
            )));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Hex representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hash length L in hex symbols.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if this hash has the length produced by [`HashExtractor`].
    pub fn is_standard_size(&self) -> bool {
        self.len() == HASH_SYMBOLS
    }

    /// Hamming distance to another hash of the same length.
    pub fn distance(&self, other: &Self) -> Result<u32> {
        hamming_distance(self, other)
    }
}

impl fmt::Display for ImageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ImageHash {
    type Err = LookalikeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for ImageHash {
    type Error = LookalikeError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<ImageHash> for String {
    fn from(hash: ImageHash) -> Self {
        hash.0
    }
}

/// Count of hex symbols that differ at matching positions.
///
/// Hashes of different length are not comparable and yield
/// [`LookalikeError::HashLengthMismatch`].
pub fn hamming_distance(a: &ImageHash, b: &ImageHash) -> Result<u32> {
    if a.len() != b.len() {
        return Err(LookalikeError::HashLengthMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let distance = a
        .as_str()
        .bytes()
        .zip(b.as_str().bytes())
        .filter(|(x, y)| x != y)
        .count();

    Ok(distance as u32)
}

/// Decode raw bytes into a raster image.
pub fn decode_image(image_data: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(image_data)
        .map_err(|e| LookalikeError::ImageDecode(format!("Failed to decode image: {}", e)))
}

/// Perceptual hash computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashExtractor;

impl HashExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Compute the perceptual hash of raw image bytes.
    pub fn extract(&self, image_data: &[u8]) -> Result<ImageHash> {
        let image = decode_image(image_data)?;
        Ok(self.hash_image(&image))
    }

    /// Compute the perceptual hash of an already decoded image.
    pub fn hash_image(&self, image: &DynamicImage) -> ImageHash {
        let normalized = image
            .resize_exact(HASH_INPUT_SIZE, HASH_INPUT_SIZE, FilterType::Triangle)
            .grayscale();

        let hash: Blockhash256 = blockhash256(&normalized);
        let bytes: [u8; 32] = hash.into();
        ImageHash::from_bytes(&bytes)
    }

    /// Length in hex symbols of every hash this extractor produces.
    pub fn hash_len(&self) -> usize {
        HASH_SYMBOLS
    }

    /// Check if the provided bytes appear to be a supported image format.
    pub fn is_supported_format(data: &[u8]) -> bool {
        image::guess_format(data).is_ok()
    }
}
