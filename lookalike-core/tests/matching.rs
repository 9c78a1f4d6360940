//! End-to-end tests for the matching engine: hashing, sync, whole-image
//! matching and the crop fallback, on synthetic images.

use std::io::Cursor;
use std::sync::Arc;

use chrono::Utc;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, RgbImage};
use lookalike_core::catalog::{
    validate_catalog, Catalog, CatalogEntry, CatalogSync, LocatorMounts, MemoryCatalog,
};
use lookalike_core::matching::ConcurrencyGauge;
use lookalike_core::{
    hamming_distance, similarity, HashExtractor, ImageComparer, ImageHash, LookalikeError,
    MatchConfig, MatchOutcome, MatchResult, Matcher, NewCatalogEntry, Tier, HASH_SYMBOLS,
    PARTIAL_MATCH_NOTE,
};
use uuid::Uuid;

// ============================================================================
// Helpers
// ============================================================================

/// Dark on the left, bright on the right.
fn horizontal_gradient(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, _| {
        let v = (x * 255 / (width - 1)) as u8;
        Rgb([v, v, v])
    })
}

/// Dark at the top, bright at the bottom.
fn vertical_gradient(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |_, y| {
        let v = (y * 255 / (height - 1)) as u8;
        Rgb([v, v, v])
    })
}

fn checkerboard(width: u32, height: u32, cell: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            Rgb([230, 230, 230])
        } else {
            Rgb([20, 20, 20])
        }
    })
}

/// Square cells of scattered gray levels, with no large-scale structure.
fn scattered_cells(width: u32, height: u32, cell: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        let (cx, cy) = (x / cell, y / cell);
        let n = cx.wrapping_mul(73_856_093) ^ cy.wrapping_mul(19_349_663);
        let v = (n % 251) as u8;
        Rgb([v, v, v])
    })
}

fn crop(image: &RgbImage, x: u32, y: u32, size: u32) -> RgbImage {
    image::imageops::crop_imm(image, x, y, size, size).to_image()
}

fn png_bytes(image: RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode PNG");
    bytes
}

fn entry(hash: &str, locator: &str) -> CatalogEntry {
    CatalogEntry {
        id: Uuid::new_v4(),
        hash: ImageHash::from_hex(hash).unwrap(),
        locator: locator.to_string(),
        created_at: Utc::now(),
    }
}

fn comparer_for(catalog: Arc<dyn Catalog>) -> ImageComparer {
    ImageComparer::new(catalog, MatchConfig::default()).unwrap()
}

// ============================================================================
// Hashing
// ============================================================================

#[test]
fn test_extract_is_deterministic() {
    let bytes = png_bytes(checkerboard(200, 150, 10));
    let extractor = HashExtractor::new();

    let first = extractor.extract(&bytes).unwrap();
    let second = extractor.extract(&bytes).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), HASH_SYMBOLS);
}

#[test]
fn test_distinct_structures_hash_differently() {
    let extractor = HashExtractor::new();
    let h = extractor
        .extract(&png_bytes(horizontal_gradient(64, 64)))
        .unwrap();
    let v = extractor
        .extract(&png_bytes(vertical_gradient(64, 64)))
        .unwrap();

    assert_ne!(h, v);
    assert!(similarity(hamming_distance(&h, &v).unwrap(), HASH_SYMBOLS) < 70.0);
}

// ============================================================================
// Whole-image matching
// ============================================================================

#[tokio::test]
async fn test_empty_catalog_returns_none() {
    let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
    let comparison = comparer_for(catalog)
        .compare(png_bytes(checkerboard(128, 128, 16)))
        .await
        .unwrap();

    assert_eq!(comparison.outcome, MatchOutcome::None);
    assert_eq!(comparison.outcome.tier(), Tier::None);
    assert!(comparison.outcome.results().is_empty());
}

#[tokio::test]
async fn test_exact_match_reports_single_result() {
    let bytes = png_bytes(horizontal_gradient(100, 80));
    let hash = HashExtractor::new().extract(&bytes).unwrap();

    // A near miss alongside the exact entry
    let flipped = if hash.as_str().starts_with('0') { "1" } else { "0" };
    let near = format!("{}{}", flipped, &hash.as_str()[1..]);

    let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
    catalog
        .insert(NewCatalogEntry::new(ImageHash::from_hex(&near).unwrap(), "/ourImages/near.png"))
        .await
        .unwrap();
    catalog
        .insert(NewCatalogEntry::new(hash, "/ourImages/gradient.png"))
        .await
        .unwrap();

    let outcome = comparer_for(catalog).compare(bytes).await.unwrap().outcome;

    assert_eq!(outcome.tier(), Tier::Exact);
    assert_eq!(outcome.results().len(), 1);
    assert_eq!(outcome.results()[0].locator, "/ourImages/gradient.png");
    assert_eq!(outcome.results()[0].similarity, 100.0);
}

#[tokio::test]
async fn test_distance_ten_is_similar_at_84_38() {
    let query = ImageHash::from_hex(&"0".repeat(64)).unwrap();
    let close = format!("{}{}", "1".repeat(10), "0".repeat(54));
    let far = format!("{}{}", "1".repeat(30), "0".repeat(34));
    let snapshot: Arc<[CatalogEntry]> =
        Arc::from(vec![entry(&close, "/close.png"), entry(&far, "/far.png")]);

    let matcher = Matcher::new(&MatchConfig::default()).unwrap();
    match matcher.find_matches(&query, snapshot).await {
        MatchOutcome::Similar(results) => {
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].locator, "/close.png");
            assert_eq!(results[0].similarity, 84.375);
            assert_eq!(format!("{:.2}", results[0].similarity), "84.38");
        }
        other => panic!("expected similar, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_bound_respected() {
    let query = ImageHash::from_hex(&"f".repeat(64)).unwrap();
    let snapshot: Arc<[CatalogEntry]> = (0..60)
        .map(|i| entry(&format!("{:0>64x}", i), &format!("/img/{}.png", i)))
        .collect::<Vec<_>>()
        .into();

    for limit in [1, 3, 5] {
        let matcher = Matcher::new(&MatchConfig::default().with_concurrency_limit(limit)).unwrap();
        let gauge = Arc::new(ConcurrencyGauge::new());

        let outcome = matcher
            .find_matches_instrumented(&query, Arc::clone(&snapshot), &gauge)
            .await;

        assert_eq!(outcome, MatchOutcome::None);
        assert_eq!(gauge.started(), 60, "every entry evaluated exactly once");
        assert!(gauge.peak() >= 1);
        assert!(
            gauge.peak() <= limit,
            "peak {} exceeded limit {}",
            gauge.peak(),
            limit
        );
        assert_eq!(gauge.in_flight(), 0);
    }
}

#[tokio::test]
async fn test_first_exact_wins_and_stops_dispatch() {
    let query = ImageHash::from_hex(&"a".repeat(64)).unwrap();
    let snapshot: Arc<[CatalogEntry]> = Arc::from(vec![
        entry(&"a".repeat(64), "/first.png"),
        entry(&"a".repeat(64), "/second.png"),
        entry(&format!("{}b", "a".repeat(63)), "/similar.png"),
    ]);
    let gauge = Arc::new(ConcurrencyGauge::new());

    let outcome = Matcher::new(&MatchConfig::default().with_concurrency_limit(1))
        .unwrap()
        .find_matches_instrumented(&query, snapshot, &gauge)
        .await;

    assert_eq!(outcome, MatchOutcome::Exact(MatchResult::exact("/first.png")));
    assert_eq!(gauge.started(), 1);
}

#[test]
fn test_startup_validation_rejects_mixed_lengths() {
    let entries = vec![entry(&"0".repeat(64), "/a.png"), entry(&"0".repeat(16), "/b.png")];
    assert!(matches!(
        validate_catalog(&entries, HASH_SYMBOLS),
        Err(LookalikeError::HashLengthMismatch {
            expected: 64,
            actual: 16
        })
    ));
}

// ============================================================================
// Crop fallback
// ============================================================================

#[tokio::test]
async fn test_partial_match_on_contained_region() {
    let tile = horizontal_gradient(64, 64);
    let tile_hash = HashExtractor::new()
        .extract(&png_bytes(tile.clone()))
        .unwrap();

    // Bright top half, dark bottom half, with the tile pasted at a
    // stride-aligned origin
    let mut canvas: RgbImage = ImageBuffer::from_fn(192, 192, |_, y| {
        if y < 96 {
            Rgb([200, 200, 200])
        } else {
            Rgb([40, 40, 40])
        }
    });
    image::imageops::replace(&mut canvas, &tile, 64, 32);
    let query = png_bytes(canvas);

    let query_hash = HashExtractor::new().extract(&query).unwrap();
    let whole = similarity(hamming_distance(&query_hash, &tile_hash).unwrap(), HASH_SYMBOLS);
    assert!(whole < 70.0, "whole-image similarity {} should not qualify", whole);

    let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
    catalog
        .insert(NewCatalogEntry::new(tile_hash, "/ourImages/tile.png"))
        .await
        .unwrap();

    let comparison = comparer_for(catalog).compare(query).await.unwrap();

    match comparison.outcome {
        MatchOutcome::Partial(result) => {
            assert_eq!(result.locator, "/ourImages/tile.png");
            assert_eq!(result.tier, Tier::Partial);
            assert!(result.similarity >= 70.0);
            assert_eq!(result.note.as_deref(), Some(PARTIAL_MATCH_NOTE));
        }
        other => panic!("expected partial, got {:?}", other),
    }
}

#[tokio::test]
async fn test_query_smaller_than_patch_has_no_partial() {
    let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
    catalog
        .insert(NewCatalogEntry::new(
            HashExtractor::new()
                .extract(&png_bytes(vertical_gradient(64, 64)))
                .unwrap(),
            "/ourImages/v.png",
        ))
        .await
        .unwrap();

    let comparison = comparer_for(catalog)
        .compare(png_bytes(horizontal_gradient(40, 40)))
        .await
        .unwrap();

    assert_eq!(comparison.outcome, MatchOutcome::None);
}

#[tokio::test]
async fn test_crop_of_indexed_image_is_partial() {
    let dir = tempfile::tempdir().unwrap();
    let original = scattered_cells(256, 256, 32);
    DynamicImage::ImageRgb8(original.clone())
        .save(dir.path().join("a.png"))
        .unwrap();
    let original_hash = HashExtractor::new()
        .extract(&png_bytes(original.clone()))
        .unwrap();

    let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
    CatalogSync::new(catalog.clone(), "/ourImages")
        .sync(dir.path())
        .await
        .unwrap();
    let comparer =
        comparer_for(catalog).with_locator_mounts(LocatorMounts::new().mount("/ourImages", dir.path()));

    for (x, y, size) in [(64, 64, 128), (0, 0, 128), (96, 96, 96), (0, 0, 64)] {
        let query = png_bytes(crop(&original, x, y, size));
        let query_hash = HashExtractor::new().extract(&query).unwrap();
        let whole = similarity(
            hamming_distance(&query_hash, &original_hash).unwrap(),
            HASH_SYMBOLS,
        );
        assert!(whole < 70.0, "crop at ({}, {}) already similar: {}", x, y, whole);

        match comparer.compare(query).await.unwrap().outcome {
            MatchOutcome::Partial(result) => {
                assert_eq!(result.locator, "/ourImages/a.png");
                assert!(result.similarity >= 70.0);
                assert_eq!(result.note.as_deref(), Some(PARTIAL_MATCH_NOTE));
            }
            other => panic!("crop at ({}, {}) size {}: expected partial, got {:?}", x, y, size, other),
        }
    }
}

#[tokio::test]
async fn test_crop_search_resolves_plain_path_locators() {
    let dir = tempfile::tempdir().unwrap();
    let original = scattered_cells(256, 256, 32);
    DynamicImage::ImageRgb8(original.clone())
        .save(dir.path().join("a.png"))
        .unwrap();

    let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
    let prefix = dir.path().display().to_string();
    CatalogSync::new(catalog.clone(), prefix.as_str())
        .sync(dir.path())
        .await
        .unwrap();

    let outcome = comparer_for(catalog)
        .compare(png_bytes(crop(&original, 64, 64, 128)))
        .await
        .unwrap()
        .outcome;

    assert_eq!(outcome.tier(), Tier::Partial);
    assert_eq!(outcome.results()[0].locator, format!("{}/a.png", prefix));
}

#[tokio::test]
async fn test_crop_search_skips_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let original = scattered_cells(256, 256, 32);
    DynamicImage::ImageRgb8(scattered_cells(256, 256, 8))
        .save(dir.path().join("a-gone.png"))
        .unwrap();
    DynamicImage::ImageRgb8(original.clone())
        .save(dir.path().join("b.png"))
        .unwrap();

    let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
    CatalogSync::new(catalog.clone(), "/ourImages")
        .sync(dir.path())
        .await
        .unwrap();
    std::fs::remove_file(dir.path().join("a-gone.png")).unwrap();

    let comparer =
        comparer_for(catalog).with_locator_mounts(LocatorMounts::new().mount("/ourImages", dir.path()));
    let query = png_bytes(crop(&original, 64, 64, 128));

    // The first entry has no file; the second is still searched
    let outcome = comparer.compare(query.clone()).await.unwrap().outcome;
    assert_eq!(outcome.tier(), Tier::Partial);
    assert_eq!(outcome.results()[0].locator, "/ourImages/b.png");

    // With every file gone the comparison still succeeds
    std::fs::remove_file(dir.path().join("b.png")).unwrap();
    let outcome = comparer.compare(query).await.unwrap().outcome;
    assert_eq!(outcome, MatchOutcome::None);
}

// ============================================================================
// Catalog sync
// ============================================================================

#[tokio::test]
async fn test_sync_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path();
    DynamicImage::ImageRgb8(horizontal_gradient(80, 80))
        .save(path.join("a.png"))
        .unwrap();
    DynamicImage::ImageRgb8(vertical_gradient(80, 80))
        .save(path.join("b.png"))
        .unwrap();
    DynamicImage::ImageRgb8(checkerboard(96, 96, 12))
        .save(path.join("c.PNG"))
        .unwrap();
    // Same pixels as a.png under another name
    std::fs::copy(path.join("a.png"), path.join("a-copy.png")).unwrap();
    std::fs::write(path.join("broken.jpg"), b"not really a jpeg").unwrap();
    std::fs::write(path.join("notes.txt"), b"ignored").unwrap();

    let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
    let sync = CatalogSync::new(catalog.clone(), "/ourImages");

    let first = sync.sync(path).await.unwrap();
    assert_eq!(first.scanned, 5);
    assert_eq!(first.inserted, 3);
    assert_eq!(first.duplicates, 1);
    assert_eq!(first.failed, 1);
    assert_eq!(catalog.count().await.unwrap(), 3);

    let second = sync.sync(path).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 4);
    assert_eq!(second.failed, 1);
    assert_eq!(catalog.count().await.unwrap(), 3);

    // Name order: "a-copy.png" sorts before "a.png" and keeps the hash
    let locators: Vec<String> = catalog
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.locator)
        .collect();
    assert_eq!(
        locators,
        vec!["/ourImages/a-copy.png", "/ourImages/b.png", "/ourImages/c.PNG"]
    );
}

#[tokio::test]
async fn test_sync_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());

    let result = CatalogSync::new(catalog, "/ourImages")
        .sync(dir.path().join("does-not-exist"))
        .await;

    assert!(matches!(result, Err(LookalikeError::Io(_))));
}

#[tokio::test]
async fn test_synced_image_matches_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let image = checkerboard(128, 96, 16);
    DynamicImage::ImageRgb8(image.clone())
        .save(dir.path().join("board.png"))
        .unwrap();

    let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
    CatalogSync::new(catalog.clone(), "/ourImages")
        .sync(dir.path())
        .await
        .unwrap();

    let outcome = comparer_for(catalog)
        .compare(png_bytes(image))
        .await
        .unwrap()
        .outcome;

    assert_eq!(outcome, MatchOutcome::Exact(MatchResult::exact("/ourImages/board.png")));
}
