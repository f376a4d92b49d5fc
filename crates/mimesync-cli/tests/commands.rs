#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{mimesync_cmd, write_source_overrides};

#[test]
fn append_then_get_and_list() -> anyhow::Result<()> {
    let data_dir = tempdir()?;
    let config_dir = tempdir()?;

    mimesync_cmd(data_dir.path(), config_dir.path())
        .args(["append", "application/x-notes", "note", ".NOTES"])
        .assert()
        .success()
        .stdout(predicate::str::contains("application/x-notes"));

    assert!(data_dir.path().join("mimetypes.json").exists());

    mimesync_cmd(data_dir.path(), config_dir.path())
        .args(["get", "todo.notes", "mystery.zzz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("todo.notes: application/x-notes"))
        .stdout(predicate::str::contains("mystery.zzz: unknown"));

    let output = mimesync_cmd(data_dir.path(), config_dir.path())
        .args(["list", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let listed: Value = serde_json::from_slice(&output)?;
    assert_eq!(
        listed,
        serde_json::json!({ "application/x-notes": ["note", "notes"] })
    );
    Ok(())
}

#[test]
fn append_rejects_malformed_mime_type() -> anyhow::Result<()> {
    let data_dir = tempdir()?;
    let config_dir = tempdir()?;

    mimesync_cmd(data_dir.path(), config_dir.path())
        .args(["append", "not-a-mimetype", "txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid MIME type"));

    assert!(!data_dir.path().join("mimetypes.json").exists());
    Ok(())
}

#[test]
fn list_on_fresh_registry_is_empty() -> anyhow::Result<()> {
    let data_dir = tempdir()?;
    let config_dir = tempdir()?;

    mimesync_cmd(data_dir.path(), config_dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Registry is empty"));
    Ok(())
}

#[test]
fn unknown_source_override_fails_fast() -> anyhow::Result<()> {
    let data_dir = tempdir()?;
    let config_dir = tempdir()?;
    std::fs::write(
        config_dir.path().join("config.toml"),
        "[sources]\ngopher = \"http://localhost/gopher\"\n",
    )?;

    mimesync_cmd(data_dir.path(), config_dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown source 'gopher'"));
    Ok(())
}

#[tokio::test]
async fn refresh_reports_each_source() -> anyhow::Result<()> {
    let data_dir = tempdir()?;
    let config_dir = tempdir()?;
    let server = MockServer::start().await;
    write_source_overrides(config_dir.path(), &server.uri());

    Mock::given(method("HEAD"))
        .and(path("/apache"))
        .respond_with(ResponseTemplate::new(200).insert_header("etag", "\"a1\""))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/apache"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"a1\"")
                .set_body_string("text/html\thtml htm\nimage/png\tpng\n"),
        )
        .mount(&server)
        .await;

    let output = mimesync_cmd(data_dir.path(), config_dir.path())
        .args(["refresh", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&output)?;

    assert_eq!(report["persisted"], Value::Bool(true));
    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 12);
    let apache = outcomes.iter().find(|o| o["source"] == "apache").unwrap();
    assert_eq!(apache["status"], "merged");
    assert_eq!(apache["version"], "\"a1\"");
    let nginx = outcomes.iter().find(|o| o["source"] == "nginx").unwrap();
    assert_eq!(nginx["status"], "failed");
    assert_eq!(nginx["category"], "network");

    mimesync_cmd(data_dir.path(), config_dir.path())
        .args(["get", "logo.png"])
        .assert()
        .success()
        .stdout(predicate::str::contains("image/png"));

    let versions: Value =
        serde_json::from_str(&std::fs::read_to_string(data_dir.path().join("versions.json"))?)?;
    assert_eq!(versions["apache"], "\"a1\"");
    assert_eq!(versions["nginx"], Value::Null);
    Ok(())
}

#[test]
fn watch_with_disabled_interval_runs_once_and_exits() -> anyhow::Result<()> {
    let data_dir = tempdir()?;
    let config_dir = tempdir()?;
    // Nothing listens on port 9, so every feed fails quickly.
    write_source_overrides(config_dir.path(), "http://127.0.0.1:9");

    mimesync_cmd(data_dir.path(), config_dir.path())
        .args(["watch", "--interval-ms", "-1"])
        .assert()
        .success();
    Ok(())
}
