use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Path to the schema-guard binary built for this test run
fn schema_guard_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_schema-guard"))
}

fn example_content() -> String {
    let example_path =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("schema-guard.toml.example");
    fs::read_to_string(example_path).unwrap()
}

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("schema-guard.toml");

    let output = Command::new(schema_guard_bin())
        .current_dir(temp_dir.path())
        .arg("init")
        .output()
        .expect("Failed to execute init command");

    assert!(
        output.status.success(),
        "Init command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(config_path.exists(), "Config file was not created");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓ Created schema-guard.toml"));
    assert!(stdout.contains("Next steps:"));
}

#[test]
fn test_init_content_matches_example() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("schema-guard.toml");

    let output = Command::new(schema_guard_bin())
        .current_dir(temp_dir.path())
        .arg("init")
        .output()
        .expect("Failed to execute init command");

    assert!(output.status.success());

    let created_content = fs::read_to_string(&config_path).unwrap();
    assert_eq!(
        created_content,
        example_content(),
        "Created config does not match example"
    );
}

#[test]
fn test_init_custom_path() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("releem.conf");

    let output = Command::new(schema_guard_bin())
        .args(["init", "--path"])
        .arg(&config_path)
        .output()
        .expect("Failed to execute init command");

    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&config_path).unwrap(), example_content());
}

#[test]
fn test_init_fails_when_config_exists() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("schema-guard.toml");

    fs::write(&config_path, "# existing config").unwrap();

    let output = Command::new(schema_guard_bin())
        .current_dir(temp_dir.path())
        .arg("init")
        .output()
        .expect("Failed to execute init command");

    assert!(
        !output.status.success(),
        "Init should fail when config exists"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already exists"));
    assert!(stderr.contains("--force"));

    // Original file untouched
    let content = fs::read_to_string(&config_path).unwrap();
    assert_eq!(content, "# existing config");
}

#[test]
fn test_init_force_overwrites_existing() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("schema-guard.toml");

    fs::write(&config_path, "# old config").unwrap();

    let output = Command::new(schema_guard_bin())
        .current_dir(temp_dir.path())
        .args(["init", "--force"])
        .output()
        .expect("Failed to execute init command");

    assert!(
        output.status.success(),
        "Init --force failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓ Overwrote schema-guard.toml"));

    let created_content = fs::read_to_string(&config_path).unwrap();
    assert_eq!(created_content, example_content());
}

#[test]
fn test_init_preserves_other_files() {
    let temp_dir = TempDir::new().unwrap();

    fs::write(temp_dir.path().join("README.md"), "test").unwrap();
    fs::create_dir(temp_dir.path().join("migrations")).unwrap();

    let output = Command::new(schema_guard_bin())
        .current_dir(temp_dir.path())
        .arg("init")
        .output()
        .expect("Failed to execute init command");

    assert!(output.status.success());

    assert!(temp_dir.path().join("README.md").exists());
    assert!(temp_dir.path().join("migrations").exists());
    assert!(temp_dir.path().join("schema-guard.toml").exists());
}

#[test]
fn test_validate_without_statements_fails() {
    let output = Command::new(schema_guard_bin())
        .arg("validate")
        .output()
        .expect("Failed to execute validate command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no statements given"));
}
