//! Hash command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use lookalike_core::{HashExtractor, PatchGeometry, PatchHashExtractor};
use tracing::info;

use crate::utils::read_image;

/// Execute the hash command.
pub async fn execute(file: PathBuf, patches: bool, quiet: bool) -> Result<()> {
    let bytes = read_image(&file)?;
    let geometry = PatchGeometry::default();

    let (hash, patch_hashes) = tokio::task::spawn_blocking(move || {
        let hash = HashExtractor::new().extract(&bytes)?;
        let patch_hashes = if patches {
            let mut sequence = PatchHashExtractor::new(geometry).extract_patches(&bytes)?;
            let mut listed = Vec::with_capacity(sequence.len());
            while let Some(origin) = sequence.next_origin() {
                match sequence.next() {
                    Some(patch) => listed.push((origin, patch)),
                    None => break,
                }
            }
            Some(listed)
        } else {
            None
        };
        Ok::<_, lookalike_core::LookalikeError>((hash, patch_hashes))
    })
    .await
    .context("Hashing task failed")?
    .with_context(|| format!("Failed to hash {}", file.display()))?;

    info!(path = %file.display(), hash = %hash, "Computed perceptual hash");

    if quiet {
        println!("{}", hash);
        return Ok(());
    }

    println!("   {} {}", "File:".dimmed(), file.display());
    println!("   {} {}", "Hash:".dimmed(), hash.to_string().bold());

    if let Some(listed) = patch_hashes {
        println!(
            "   {} {} patches ({}x{}, step {})",
            "Crops:".dimmed(),
            listed.len(),
            geometry.patch_size(),
            geometry.patch_size(),
            geometry.step()
        );
        for ((x, y), patch) in listed {
            println!("     {:>5},{:<5} {}", x, y, patch);
        }
    }

    Ok(())
}
