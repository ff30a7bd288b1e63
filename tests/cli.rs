use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn convkit_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("convkit");
    path
}

/// Config that uses the offline keyword provider, so no model is downloaded.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_path = config_dir.join("convkit.toml");
    fs::write(
        &config_path,
        r#"[embedding]
provider = "keyword"

[chat]
threshold = 0.35

[logging]
filter = "convkit=warn"
"#,
    )
    .unwrap();

    (tmp, config_path)
}

fn run_convkit(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = convkit_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run convkit binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_convert_meters_to_kilometers() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_convkit(
        &config_path,
        &["convert", "1000", "Meter", "Kilometer", "--category", "Length"],
    );
    assert!(success, "convert failed: stderr={}", stderr);
    assert_eq!(stdout.trim(), "1000 Meter = 1.0000 Kilometer");
}

#[test]
fn test_convert_negative_temperature() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_convkit(&config_path, &["convert", "-40", "C", "F"]);
    assert!(success, "convert failed: stderr={}", stderr);
    assert!(stdout.contains("= -40.0000 Fahrenheit"), "stdout={}", stdout);
}

#[test]
fn test_convert_json() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) =
        run_convkit(&config_path, &["convert", "1", "Hour", "Minute", "--json"]);
    assert!(success);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["category"], "Time");
    assert_eq!(json["result"], 60.0);
}

#[test]
fn test_convert_unknown_unit_fails_cleanly() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_convkit(
        &config_path,
        &["convert", "1", "Smoot", "Meter", "--category", "Length"],
    );
    assert!(!success);
    assert!(stderr.contains("unknown unit 'Smoot'"), "stderr={}", stderr);
    assert!(!stderr.contains("panicked"));
}

#[test]
fn test_convert_non_numeric_value_fails_cleanly() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_convkit(&config_path, &["convert", "ten", "m", "km"]);
    assert!(!success);
    assert!(stderr.contains("'ten' is not a number"), "stderr={}", stderr);
}

#[test]
fn test_units_lists_every_category() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_convkit(&config_path, &["units"]);
    assert!(success);
    for category in ["Length", "Mass", "Temperature", "Time"] {
        assert!(stdout.contains(category), "missing {}", category);
    }
}

#[test]
fn test_ask_redirects_conversions() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_convkit(&config_path, &["ask", "convert 5 km to miles"]);
    assert!(success);
    assert!(stdout.contains("unit conversion"), "stdout={}", stdout);
}

#[test]
fn test_ask_matches_reference_sentence() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_convkit(
        &config_path,
        &["ask", "what tools does this website have", "--json"],
    );
    assert!(success, "ask failed: stderr={}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["kind"], "matched");
    assert_eq!(json["section"], "About");
}

#[test]
fn test_ask_without_answer() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) =
        run_convkit(&config_path, &["ask", "who won the football match yesterday"]);
    assert!(success);
    assert!(stdout.contains("could not find an answer"), "stdout={}", stdout);
}

#[test]
fn test_bmi_with_centimeters() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_convkit(
        &config_path,
        &["bmi", "--weight-kg", "70", "--height-cm", "175"],
    );
    assert!(success);
    assert!(stdout.contains("BMI: 22.9 (Normal weight)"), "stdout={}", stdout);
}

#[test]
fn test_bmi_requires_height() {
    let (_tmp, config_path) = setup_test_env();
    let (_, _, success) = run_convkit(&config_path, &["bmi", "--weight-kg", "70"]);
    assert!(!success);
}

#[test]
fn test_bad_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(&config_path, "[chat]\nthreshold = 7.0\n").unwrap();
    let (_, stderr, success) = run_convkit(&config_path, &["units"]);
    assert!(!success);
    assert!(stderr.contains("chat.threshold"), "stderr={}", stderr);
}
