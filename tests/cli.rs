use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

const ENV_KEYS: &[&str] = &[
    "PORT",
    "NODE_ENV",
    "PUBLIC_URL",
    "GITHUB_CLIENT_ID",
    "GITHUB_CLIENT_SECRET",
    "GITHUB_TOKEN",
    "OPEN_API_KEY",
    "COMPLETION_API_KEY",
    "BASE_URL",
    "COMPLETION_BASE_URL",
    "model",
    "COMPLETION_MODEL",
];

fn repochat() -> Command {
    let mut cmd = Command::cargo_bin("repochat").unwrap();
    for key in ENV_KEYS {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn help_lists_subcommands() {
    repochat()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn status_with_complete_config_is_valid() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[github]\nclient_id = \"Iv1.abc\"\nclient_secret = \"topsecret\"\n\n[completion]\napi_key = \"hf_longkey\""
    )
    .unwrap();

    repochat()
        .arg("--config")
        .arg(file.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid"))
        .stdout(predicate::str::contains("topsecret").not())
        .stdout(predicate::str::contains("tops****"));
}

#[test]
fn status_reports_missing_credentials() {
    let file = tempfile::NamedTempFile::new().unwrap();

    repochat()
        .arg("--config")
        .arg(file.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Incomplete"))
        .stdout(predicate::str::contains("missing github.client_id"));
}

#[test]
fn missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();

    repochat()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("status")
        .assert()
        .failure();
}
