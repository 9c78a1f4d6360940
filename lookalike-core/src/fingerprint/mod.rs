//! Image fingerprinting.
//!
//! This module turns raw image bytes into fixed-length perceptual hashes that
//! stay close (in Hamming distance) for visually similar images.
//!
//! # Components
//!
//! - **Perceptual hashing**: whole-image block-mean-value hash used for exact
//!   and similar matching.
//! - **Patch hashing**: hashes of overlapping square crops, used as the
//!   region-based fallback when the whole image has no match.

pub mod patch;
pub mod perceptual;

pub use patch::{PatchGeometry, PatchHashExtractor, PatchHashes};
pub use perceptual::*;
