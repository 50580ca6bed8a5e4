use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

/// The binary with every credential and override variable cleared
fn taskmgmt() -> Command {
    let mut cmd = Command::cargo_bin("taskmgmt").unwrap();
    for var in [
        "CONFIG_FILE",
        "LOG_LEVEL",
        "RUST_LOG",
        "GENESYSCLOUD_ACCESS_TOKEN",
        "GENESYSCLOUD_OAUTHCLIENT_ID",
        "GENESYSCLOUD_OAUTHCLIENT_SECRET",
        "GENESYSCLOUD_REGION",
        "GENESYSCLOUD_API_URL",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let output = taskmgmt().arg("--help").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["worktype", "workbin", "rule", "lookup", "export"] {
        assert!(stdout.contains(subcommand), "help should mention {subcommand}");
    }
}

#[test]
fn test_version() {
    taskmgmt().arg("--version").assert().success();
}

#[test]
fn test_missing_credentials_fail_validation() {
    let output = taskmgmt().arg("export").output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Missing credentials"), "stderr: {stderr}");
}

#[test]
fn test_unknown_region_fails_validation() {
    let output = taskmgmt()
        .env("GENESYSCLOUD_ACCESS_TOKEN", "token")
        .args(["--region", "moon-1", "export"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown region"));
}

#[test]
fn test_unknown_rule_kind_is_a_usage_error() {
    taskmgmt()
        .args(["rule", "apply", "hourly", "rule.toml"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_unreadable_config_file_fails_before_any_request() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.toml");

    // Nothing listens on the discard port; the command must fail on the file first
    let output = taskmgmt()
        .env("GENESYSCLOUD_ACCESS_TOKEN", "token")
        .env("GENESYSCLOUD_API_URL", "http://127.0.0.1:9")
        .args(["worktype", "apply"])
        .arg(&missing)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.toml"), "stderr: {stderr}");
}

#[test]
fn test_config_file_is_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("taskmgmt.toml");
    fs::write(
        &config_path,
        "[logging]\nlevel = \"loud\"\nformat = \"compact\"\n",
    )
    .unwrap();

    let output = taskmgmt()
        .env("GENESYSCLOUD_ACCESS_TOKEN", "token")
        .arg("--config")
        .arg(&config_path)
        .arg("export")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("loud"));
}
