//! Common utility functions shared across CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use lookalike_core::Tier;
use tracing::debug;

const BANNER_WIDTH: usize = 40;

/// Read an input image into memory.
pub fn read_image(path: &Path) -> Result<Vec<u8>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read file");
    Ok(bytes)
}

/// Format a similarity percentage with two decimals.
pub fn format_similarity(similarity: f64) -> String {
    format!("{:.2}%", similarity)
}

/// Headline shown for a comparison outcome.
pub fn tier_title(tier: Tier) -> &'static str {
    match tier {
        Tier::Exact => "EXACT MATCH",
        Tier::Similar => "SIMILAR IMAGES",
        Tier::Partial => "PARTIAL MATCH",
        Tier::None => "NO MATCH",
    }
}

/// Paint text in the color associated with a tier.
pub fn paint(text: &str, tier: Tier) -> ColoredString {
    match tier {
        Tier::Exact => text.green(),
        Tier::Similar => text.cyan(),
        Tier::Partial => text.yellow(),
        Tier::None => text.normal(),
    }
}

/// Print a boxed, centered title.
pub fn print_banner(title: &str, tier: Tier) {
    let rule = "═".repeat(BANNER_WIDTH);
    println!();
    println!("{}", paint(&format!("╔{}╗", rule), tier));
    println!(
        "{}",
        paint(&format!("║{:^width$}║", title, width = BANNER_WIDTH), tier).bold()
    );
    println!("{}", paint(&format!("╚{}╝", rule), tier));
    println!();
}
