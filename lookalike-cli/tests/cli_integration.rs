//! CLI integration tests for lookalike-cli.
//!
//! These tests verify the CLI behavior by running the actual binary
//! against synthetic images and checking outputs and exit codes.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use image::{ImageBuffer, Rgb, RgbImage};
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Get a Command for the lookalike binary.
fn lookalike() -> Command {
    Command::cargo_bin("lookalike").unwrap()
}

fn gradient(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        let v = ((x * 2 + y) % 256) as u8;
        Rgb([v, v / 2, 255 - v])
    })
}

fn write_png(path: &Path, image: &RgbImage) {
    image.save(path).unwrap();
}

/// Temp dir holding `query.png` and an empty `reference/` directory.
fn workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    write_png(&temp.path().join("query.png"), &gradient(128, 128));
    fs::create_dir(temp.path().join("reference")).unwrap();
    temp
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    lookalike()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Perceptual-hash image matching"))
        .stdout(predicate::str::contains("hash"))
        .stdout(predicate::str::contains("compare"));
}

#[test]
fn test_version_displays_version() {
    lookalike()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lookalike"));
}

#[test]
fn test_help_shows_exit_codes() {
    lookalike()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("66"));
}

#[test]
fn test_compare_help_shows_options() {
    lookalike()
        .args(["compare", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--reference"))
        .stdout(predicate::str::contains("--threshold"))
        .stdout(predicate::str::contains("--concurrency"))
        .stdout(predicate::str::contains("--json"));
}

// ============================================================================
// Hash Tests
// ============================================================================

#[test]
fn test_hash_quiet_prints_bare_hash() {
    let temp = workspace();

    let output = lookalike()
        .args(["--quiet", "hash", arg(&temp.path().join("query.png"))])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let hash = stdout.trim();
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_hash_is_stable_across_runs() {
    let temp = workspace();
    let file = temp.path().join("query.png");

    let first = lookalike()
        .args(["-q", "hash", arg(&file)])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let second = lookalike()
        .args(["-q", "hash", arg(&file)])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert_eq!(first, second);
}

#[test]
fn test_hash_lists_patches() {
    let temp = workspace();

    // 128x128 with 64px crops every 16px: 5 positions per axis
    lookalike()
        .args(["hash", "--patches", arg(&temp.path().join("query.png"))])
        .assert()
        .success()
        .stdout(predicate::str::contains("25 patches"))
        .stdout(predicate::str::contains("step 16"));
}

#[test]
fn test_hash_missing_file_returns_input_error() {
    lookalike()
        .args(["hash", "nonexistent_file.png"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn test_hash_non_image_returns_data_error() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("notes.png");
    fs::write(&file, b"not an image at all").unwrap();

    lookalike()
        .args(["hash", arg(&file)])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Failed to hash"));
}

// ============================================================================
// Compare Tests
// ============================================================================

#[test]
fn test_compare_exact_match() {
    let temp = workspace();
    let reference = temp.path().join("reference");
    fs::copy(temp.path().join("query.png"), reference.join("copy.png")).unwrap();

    lookalike()
        .args([
            "--color=never",
            "compare",
            arg(&temp.path().join("query.png")),
            "--reference",
            arg(&reference),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("EXACT MATCH"))
        .stdout(predicate::str::contains("100.00%"))
        .stdout(predicate::str::contains("copy.png"));
}

#[test]
fn test_compare_json_output() {
    let temp = workspace();
    let reference = temp.path().join("reference");
    fs::copy(temp.path().join("query.png"), reference.join("copy.png")).unwrap();
    fs::write(reference.join("readme.txt"), b"ignored").unwrap();

    let output = lookalike()
        .args([
            "compare",
            arg(&temp.path().join("query.png")),
            "-r",
            arg(&reference),
            "--json",
        ])
        .assert()
        .success();

    let json: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(json["tier"], "exact");
    assert_eq!(json["reference"]["inserted"], 1);
    assert_eq!(json["results"][0]["similarity"], 100.0);
    assert!(json["results"][0]["locator"]
        .as_str()
        .unwrap()
        .ends_with("copy.png"));
}

#[test]
fn test_compare_empty_reference_is_not_an_error() {
    let temp = workspace();

    lookalike()
        .args([
            "-q",
            "compare",
            arg(&temp.path().join("query.png")),
            "--reference",
            arg(&temp.path().join("reference")),
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("none\n"));
}

#[test]
fn test_compare_missing_reference_returns_input_error() {
    let temp = workspace();

    lookalike()
        .args([
            "compare",
            arg(&temp.path().join("query.png")),
            "--reference",
            arg(&temp.path().join("does-not-exist")),
        ])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read reference directory"));
}

#[test]
fn test_compare_invalid_threshold_returns_usage_error() {
    let temp = workspace();

    lookalike()
        .args([
            "compare",
            arg(&temp.path().join("query.png")),
            "--reference",
            arg(&temp.path().join("reference")),
            "--threshold",
            "150",
        ])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("threshold"));
}

#[test]
fn test_compare_zero_concurrency_returns_usage_error() {
    let temp = workspace();

    lookalike()
        .args([
            "compare",
            arg(&temp.path().join("query.png")),
            "--reference",
            arg(&temp.path().join("reference")),
            "--concurrency",
            "0",
        ])
        .assert()
        .code(64);
}

// ============================================================================
// Output Mode Tests
// ============================================================================

#[test]
fn test_color_never_no_ansi() {
    let temp = workspace();
    let reference = temp.path().join("reference");
    fs::copy(temp.path().join("query.png"), reference.join("copy.png")).unwrap();

    let output = lookalike()
        .args([
            "--color=never",
            "-v",
            "compare",
            arg(&temp.path().join("query.png")),
            "--reference",
            arg(&reference),
        ])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let stderr = String::from_utf8_lossy(&output.get_output().stderr);

    // ANSI escape codes start with \x1b[
    assert!(
        !stdout.contains("\x1b["),
        "Color=never stdout should not contain ANSI codes"
    );
    assert!(
        !stderr.contains("\x1b["),
        "Color=never stderr should not contain ANSI codes"
    );
}
