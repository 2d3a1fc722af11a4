mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use common::{config_toml, noid_handler, record, StubServer};

fn geoark_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("geoark");
    path
}

fn setup_test_env(noid_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("datasets");
    fs::create_dir_all(data_dir.join("roads")).unwrap();
    fs::write(
        data_dir.join("roads/roads.shp.xml"),
        record("Milwaukee_Roads_2020", "public"),
    )
    .unwrap();
    fs::write(
        data_dir.join("parcels.shp.xml"),
        record("Parcels_2019", "restricted-uw-system"),
    )
    .unwrap();

    let config_content = format!(
        "{}\n[ingest]\nroot = \"{}\"\n",
        config_toml(noid_url),
        data_dir.display()
    );
    let config_path = config_dir.join("geoark.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_geoark(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = geoark_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run geoark binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_uris_prints_landing_and_download() {
    let (_tmp, config_path) = setup_test_env("https://noid.invalid/noidu_gmgs?");

    let (stdout, stderr, success) = run_geoark(
        &config_path,
        &["uris", "77981/gmgssf2mb2h", "--rights", "public", "--title", "MyDataset"],
    );
    assert!(success, "uris failed: {}", stderr);
    assert!(stdout.contains("https://discover.example.org/ark:-77981-gmgssf2mb2h"));
    assert!(stdout.contains("https://geodata.example.org/public/gmgssf2mb2h/MyDataset.zip"));
}

#[test]
fn test_uris_rejects_bad_ark() {
    let (_tmp, config_path) = setup_test_env("https://noid.invalid/noidu_gmgs?");

    let (_, stderr, success) = run_geoark(&config_path, &["uris", "123/abc", "--title", "T"]);
    assert!(!success);
    assert!(stderr.contains("invalid ARK identifier format"));
}

#[test]
fn test_bind_bad_ark_fails_before_network() {
    let server = StubServer::start(noid_handler(200));
    let (_tmp, config_path) = setup_test_env(&server.noid_url());

    let (_, stderr, success) = run_geoark(&config_path, &["bind", "123/abc"]);
    assert!(!success);
    assert!(stderr.contains("invalid ARK identifier format"));
    assert!(server.requests().is_empty());
}

#[test]
fn test_write_with_given_ark_is_idempotent() {
    let (tmp, config_path) = setup_test_env("https://noid.invalid/noidu_gmgs?");
    let record_path = tmp.path().join("datasets/roads/roads.shp.xml");
    let record_arg = record_path.to_str().unwrap();

    let args = ["write", record_arg, "--ark", "77981/gmgssf2mb2h"];
    let (stdout, stderr, success) = run_geoark(&config_path, &args);
    assert!(success, "write failed: {}", stderr);
    assert!(stdout.contains("ark:/77981/gmgssf2mb2h"));
    let first = fs::read_to_string(&record_path).unwrap();

    let (_, stderr, success) = run_geoark(&config_path, &args);
    assert!(success, "second write failed: {}", stderr);
    let second = fs::read_to_string(&record_path).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.matches("<mdFileID>").count(), 1);
    assert!(second.contains(
        "<dataSetURI>https://geodata.example.org/public/gmgssf2mb2h/Milwaukee_Roads_2020.zip</dataSetURI>"
    ));
}

#[test]
fn test_write_mints_when_no_ark_given() {
    let server = StubServer::start(noid_handler(200));
    let (tmp, config_path) = setup_test_env(&server.noid_url());
    let record_path = tmp.path().join("datasets/parcels.shp.xml");

    let (stdout, stderr, success) = run_geoark(
        &config_path,
        &["write", record_path.to_str().unwrap(), "--bind"],
    );
    assert!(success, "write failed: {}", stderr);
    assert!(stdout.contains("ark:/77981/gmgs0000001"));
    assert_eq!(server.count("mint+1"), 1);
    assert_eq!(server.count("bind+set+77981/gmgs0000001+where+"), 1);

    let xml = fs::read_to_string(&record_path).unwrap();
    assert!(xml.contains("restricted-uw-system/gmgs0000001/Parcels_2019.zip"));
}

#[test]
fn test_hours_updates_contacts() {
    let (tmp, config_path) = setup_test_env("https://noid.invalid/noidu_gmgs?");
    let record_path = tmp.path().join("datasets/parcels.shp.xml");

    let (stdout, stderr, success) = run_geoark(
        &config_path,
        &["hours", record_path.to_str().unwrap(), "Tue-Thu 10-2"],
    );
    assert!(success, "hours failed: {}", stderr);
    assert!(stdout.contains("updated 1 contact(s)"));
    let xml = fs::read_to_string(&record_path).unwrap();
    assert!(xml.contains("<cntHours>Tue-Thu 10-2</cntHours>"));
}

#[test]
fn test_ingest_dry_run_lists_datasets() {
    let server = StubServer::start(noid_handler(200));
    let (_tmp, config_path) = setup_test_env(&server.noid_url());

    let (stdout, stderr, success) = run_geoark(&config_path, &["ingest", "--dry-run"]);
    assert!(success, "dry run failed: {}", stderr);
    assert!(stdout.contains("datasets found: 2"));
    assert!(stdout.contains("parcels.shp.xml  [restricted-uw-system]  Parcels_2019"));
    assert!(stdout.contains("roads/roads.shp.xml  [public]  Milwaukee_Roads_2020"));
    assert!(server.requests().is_empty());
}

#[test]
fn test_ingest_reports_failures_and_exits_nonzero() {
    let server = StubServer::start(noid_handler(200));
    let (tmp, config_path) = setup_test_env(&server.noid_url());
    fs::write(tmp.path().join("datasets/broken.shp.xml"), "<metadata>").unwrap();

    let (stdout, stderr, success) =
        run_geoark(&config_path, &["ingest", "--progress", "json"]);
    assert!(!success);
    assert!(stderr.contains(r#""dataset":"broken.shp.xml","ok":false"#));
    assert!(stderr.contains(r#""step":"load""#));
    assert!(stdout.contains("FAILED broken.shp.xml at load"));
    assert!(stdout.contains("2 succeeded, 1 failure(s)"));
    assert!(stderr.contains("1 of 3 dataset(s) failed"));
    assert_eq!(server.count("mint+1"), 2);
    assert_eq!(server.count("bind+set+"), 2);
}

#[test]
fn test_endpoints_marks_active_environment() {
    let (_tmp, config_path) = setup_test_env("https://noid.invalid/noidu_gmgs?");

    let (stdout, stderr, success) = run_geoark(&config_path, &["endpoints"]);
    assert!(success, "endpoints failed: {}", stderr);
    assert!(stdout.contains("mint url:  https://noid.invalid/noidu_gmgs?mint+1"));

    let (stdout, _, success) = run_geoark(&config_path, &["--env", "production", "endpoints"]);
    assert!(success);
    let production = stdout
        .lines()
        .find(|l| l.starts_with("production"))
        .unwrap();
    assert!(production.contains('*'));
    let development = stdout
        .lines()
        .find(|l| l.starts_with("development"))
        .unwrap();
    assert!(!development.contains('*'));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_geoark(&tmp.path().join("nope.toml"), &["endpoints"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
