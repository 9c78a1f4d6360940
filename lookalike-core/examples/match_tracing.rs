//! Example demonstrating matcher tracing instrumentation.
//!
//! Run with: cargo run -p lookalike-core --example match_tracing -- <IMAGE> <DIR>

use std::sync::Arc;

use lookalike_core::{Catalog, CatalogSync, ImageComparer, MatchConfig, MemoryCatalog};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::new("lookalike_core=debug,info"))
        .with_target(true)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(query), Some(directory)) = (args.next(), args.next()) else {
        eprintln!("Usage: match_tracing <IMAGE> <DIR>");
        return;
    };

    println!("=== Matcher Tracing Demo ===\n");

    let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
    match CatalogSync::new(Arc::clone(&catalog), directory.as_str())
        .sync(&directory)
        .await
    {
        Ok(report) => println!("\nIndexed {} of {} files\n", report.inserted, report.scanned),
        Err(e) => {
            eprintln!("Failed to index {}: {}", directory, e);
            return;
        }
    }

    let comparer = match ImageComparer::new(catalog, MatchConfig::default()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create comparer: {}", e);
            return;
        }
    };

    let bytes = match std::fs::read(&query) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Failed to read {}: {}", query, e);
            return;
        }
    };

    match comparer.compare(bytes).await {
        Ok(comparison) => {
            println!("\nTier:  {}", comparison.outcome.tier());
            println!("Hash:  {}", comparison.query_hash);
            for result in comparison.outcome.results() {
                println!("  {:>6.2}%  {}", result.similarity, result.locator);
            }
        }
        Err(e) => println!("\nFailed: {}", e),
    }
}
