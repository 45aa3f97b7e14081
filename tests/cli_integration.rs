//! CLI integration tests
//!
//! Exercises argument handling and the failure paths that return before a
//! browser is launched.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("pharmascrape");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    let mut cmd = cargo_bin_cmd!("pharmascrape");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("token"))
        .stdout(predicate::str::contains("sku"))
        .stdout(predicate::str::contains("medicines"))
        .stdout(predicate::str::contains("categories"))
        .stdout(predicate::str::contains("discover"))
        .stdout(predicate::str::contains("product-page"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_sku_help_lists_batch_options() {
    let mut cmd = cargo_bin_cmd!("pharmascrape");
    cmd.args(["sku", "--help"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--pincode"))
        .stdout(predicate::str::contains("--rate-limit-ms"))
        .stdout(predicate::str::contains("--retry-failed"));
}

#[test]
fn test_missing_subcommand() {
    let mut cmd = cargo_bin_cmd!("pharmascrape");

    cmd.assert().failure().code(2);
}

#[test]
fn test_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    let mut cmd = cargo_bin_cmd!("pharmascrape");
    cmd.args(["--config", missing.to_str().unwrap(), "token"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_invalid_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    std::fs::write(&config, "[browser]\npoll_interval_ms = 0\n").unwrap();

    let mut cmd = cargo_bin_cmd!("pharmascrape");
    cmd.args(["--config", config.to_str().unwrap(), "token"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_ms"));
}

#[test]
fn test_sku_without_input() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    std::fs::write(&config, "").unwrap();

    let mut cmd = cargo_bin_cmd!("pharmascrape");
    cmd.args(["--config", config.to_str().unwrap(), "sku"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No SKUs given"));
}

#[test]
fn test_sku_unreadable_input_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    std::fs::write(&config, "").unwrap();

    let mut cmd = cargo_bin_cmd!("pharmascrape");
    cmd.args([
        "--config",
        config.to_str().unwrap(),
        "sku",
        "--input",
        temp_dir.path().join("skus.txt").to_str().unwrap(),
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read SKU list"));
}

#[test]
fn test_medicines_enrich_missing_source() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    std::fs::write(&config, "").unwrap();

    let mut cmd = cargo_bin_cmd!("pharmascrape");
    cmd.args([
        "--config",
        config.to_str().unwrap(),
        "medicines",
        "enrich",
        "--source",
        temp_dir.path().join("index.json").to_str().unwrap(),
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read source file"));
}

#[test]
fn test_medicines_index_rejects_bad_letters() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    std::fs::write(&config, "").unwrap();

    let mut cmd = cargo_bin_cmd!("pharmascrape");
    cmd.args([
        "--config",
        config.to_str().unwrap(),
        "medicines",
        "index",
        "--letters",
        "Z-A",
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid letter range"));
}

#[test]
fn test_categories_rejects_unknown_category() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    std::fs::write(&config, "").unwrap();

    let mut cmd = cargo_bin_cmd!("pharmascrape");
    cmd.args([
        "--config",
        config.to_str().unwrap(),
        "categories",
        "--category",
        "Groceries",
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unknown category: Groceries"));
}

#[test]
fn test_discover_help_mentions_sku_list() {
    let mut cmd = cargo_bin_cmd!("pharmascrape");
    cmd.args(["discover", "--help"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--max-products"))
        .stdout(predicate::str::contains("--sku-list"));
}
