//! Compare command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use lookalike_core::{
    Catalog, CatalogSync, Comparison, ImageComparer, MatchConfig, MemoryCatalog, SyncReport,
};
use tracing::info;

use crate::utils::{format_similarity, paint, print_banner, read_image, tier_title};

pub struct CompareArgs {
    pub file: PathBuf,
    pub reference: PathBuf,
    pub threshold: f64,
    pub concurrency: usize,
    pub json: bool,
}

/// Execute the compare command.
///
/// The reference directory is indexed into a throwaway in-memory catalog,
/// then the query runs through the same pipeline as the server.
pub async fn execute(args: CompareArgs, quiet: bool) -> Result<()> {
    let config = MatchConfig::default()
        .with_threshold(args.threshold)
        .with_concurrency_limit(args.concurrency);

    let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
    let comparer =
        ImageComparer::new(Arc::clone(&catalog), config).context("Invalid matching options")?;

    let query = read_image(&args.file)?;

    let prefix = args.reference.display().to_string();
    let report = CatalogSync::new(catalog, prefix)
        .sync(&args.reference)
        .await
        .with_context(|| {
            format!(
                "Failed to read reference directory: {}",
                args.reference.display()
            )
        })?;

    let comparison = comparer
        .compare(query)
        .await
        .with_context(|| format!("Failed to compare {}", args.file.display()))?;

    info!(
        tier = %comparison.outcome.tier(),
        results = comparison.outcome.results().len(),
        "Comparison finished"
    );

    if args.json {
        print_json(&comparison, &report)
    } else if quiet {
        println!("{}", comparison.outcome.tier());
        Ok(())
    } else {
        print_human(&comparison, &report, &args);
        Ok(())
    }
}

fn print_json(comparison: &Comparison, report: &SyncReport) -> Result<()> {
    let output = serde_json::json!({
        "tier": comparison.outcome.tier(),
        "query_hash": comparison.query_hash.to_string(),
        "reference": report,
        "results": comparison.outcome.results(),
    });
    let rendered = serde_json::to_string_pretty(&output).context("Failed to serialize result")?;
    println!("{}", rendered);
    Ok(())
}

fn print_human(comparison: &Comparison, report: &SyncReport, args: &CompareArgs) {
    let tier = comparison.outcome.tier();
    print_banner(tier_title(tier), tier);

    println!("   {} {}", "Query:".dimmed(), args.file.display());
    println!("   {} {}", "Hash:".dimmed(), comparison.query_hash);
    println!(
        "   {} {} indexed, {} duplicates, {} unreadable",
        "Reference:".dimmed(),
        report.inserted,
        report.duplicates,
        report.failed
    );
    println!(
        "   {} {}",
        "Threshold:".dimmed(),
        format_similarity(args.threshold)
    );

    if comparison.outcome.is_match() {
        println!();
        for result in comparison.outcome.results() {
            println!(
                "   {:>8}  {}",
                paint(&format_similarity(result.similarity), tier),
                result.locator
            );
            if let Some(note) = &result.note {
                println!("             {}", note.dimmed());
            }
        }
    }
}
