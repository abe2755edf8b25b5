use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `ddb` isolated from the caller's credentials, env files and config.
fn ddb(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ddb").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env_remove("DDB_USER")
        .env_remove("DDB_PASSWORD")
        .env_remove("DDB_URL")
        .env_remove("DDB_DATABASE")
        .env_remove("DDB_ENV_FILE")
        .env_remove("DDB_INSECURE");
    cmd
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    ddb(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("queries"))
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("annotation"));
}

#[test]
fn listing_without_credentials_explains_what_to_set() {
    let home = TempDir::new().unwrap();
    ddb(&home)
        .args(["queries", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DDB_USER"));
}

#[test]
fn password_is_required_even_with_user() {
    let home = TempDir::new().unwrap();
    ddb(&home)
        .args(["queries", "list", "--user", "alice@example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DDB_PASSWORD"));
}

#[test]
fn by_parts_and_append_conflict() {
    let home = TempDir::new().unwrap();
    ddb(&home)
        .args(["download", "q1", "--by-parts", "--append"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn config_set_then_get() {
    let home = TempDir::new().unwrap();
    ddb(&home)
        .args(["config", "set", "database", "discoursedb_ext_cmu", "--global"])
        .assert()
        .success();

    ddb(&home)
        .args(["config", "get", "database"])
        .assert()
        .success()
        .stdout("discoursedb_ext_cmu\n");
}

#[test]
fn config_rejects_unknown_keys() {
    let home = TempDir::new().unwrap();
    ddb(&home)
        .args(["config", "set", "password", "hunter2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn env_file_supplies_credentials() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".env"), "DDB_USER=alice@example.com\n").unwrap();
    ddb(&home)
        .args(["queries", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DDB_PASSWORD"));
}
