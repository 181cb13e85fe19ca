use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn harvest_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("harvest").unwrap();
    cmd.env("HARVEST_DB_PATH", temp_dir.path().join("test.db"))
        .env_remove("RUST_LOG")
        .env_remove("BROWSERLESS_URL")
        .env_remove("RENDERER_URL");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let temp_dir = TempDir::new().unwrap();
    harvest_cmd(&temp_dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("crawl"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("clear-cache"));
}

#[test]
fn test_crawl_help_shows_dry_run_flag() {
    let temp_dir = TempDir::new().unwrap();
    harvest_cmd(&temp_dir)
        .args(["crawl", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_list_on_empty_database() {
    let temp_dir = TempDir::new().unwrap();
    harvest_cmd(&temp_dir)
        .args(["list", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No items."));
}

#[test]
fn test_list_rejects_unknown_direction() {
    let temp_dir = TempDir::new().unwrap();
    harvest_cmd(&temp_dir)
        .args(["list", "1", "--cursor", "5", "--direction", "sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("direction must be"));
}

#[test]
fn test_list_rejects_unknown_order_field() {
    let temp_dir = TempDir::new().unwrap();
    harvest_cmd(&temp_dir)
        .args(["list", "1", "--order-by", "title"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported ordering field"));
}

#[test]
fn test_list_rejects_bad_cursor() {
    let temp_dir = TempDir::new().unwrap();
    harvest_cmd(&temp_dir)
        .args(["list", "1", "--cursor", "last tuesday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid cursor"));
}

#[test]
fn test_clear_cache() {
    let temp_dir = TempDir::new().unwrap();
    harvest_cmd(&temp_dir)
        .arg("clear-cache")
        .assert()
        .success()
        .stdout(predicate::str::contains("HTML cache cleared."));
}

#[test]
fn test_crawl_missing_descriptor_file() {
    let temp_dir = TempDir::new().unwrap();
    harvest_cmd(&temp_dir)
        .args(["crawl", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading descriptor file"));
}

#[test]
fn test_crawl_rejects_incomplete_descriptor() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("source.json");
    std::fs::write(
        &path,
        r#"{"kind": "list_scrape", "url": "https://example.com", "selectors": {"item": ".post"}}"#,
    )
    .unwrap();

    harvest_cmd(&temp_dir)
        .arg("crawl")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid source descriptor"));
}

#[test]
fn test_unknown_default_backend_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("source.json");
    std::fs::write(&path, r#"{"kind": "syndication", "url": "https://example.com/feed"}"#).unwrap();

    harvest_cmd(&temp_dir)
        .env("HARVEST_DEFAULT_BACKEND", "selenium")
        .arg("crawl")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("selenium"));
}
