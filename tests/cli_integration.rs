/// End-to-end tests for the command line surface
///
/// These run the real binary against a temporary sessions database via
/// `KAVIRA_SESSIONS_DB`, so no user state is touched.
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use kavira::session::{Message, SessionStore};
use kavira::{ChatMode, ChatSession};

fn kavira_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kavira").unwrap();
    cmd.env("KAVIRA_SESSIONS_DB", dir.path().join("sessions.db"));
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("kavira").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("sessions"))
        .stdout(predicate::str::contains("imagine"))
        .stdout(predicate::str::contains("speak"))
        .stdout(predicate::str::contains("listen"));
}

#[test]
fn test_sessions_list_empty() {
    let dir = TempDir::new().unwrap();

    let mut cmd = kavira_cmd(&dir);
    cmd.arg("sessions").arg("list");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No saved sessions."));
}

#[test]
fn test_sessions_list_shows_saved_titles() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("sessions.db");

    {
        let store = SessionStore::new(&db_path).unwrap();
        store
            .upsert(ChatSession::new(
                ChatMode::Fast,
                vec![Message::user("weather in Lisbon"), Message::model("sunny")],
            ))
            .unwrap();
    }

    let mut cmd = kavira_cmd(&dir);
    cmd.arg("sessions").arg("list");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("weather in Lisbon"))
        .stdout(predicate::str::contains("FAST"));
}

#[test]
fn test_sessions_delete_by_prefix() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("sessions.db");

    let session = ChatSession::new(ChatMode::Fast, vec![Message::user("to be deleted")]);
    let prefix = session.id[..8].to_string();
    {
        let store = SessionStore::new(&db_path).unwrap();
        store.upsert(session).unwrap();
    }

    let mut cmd = kavira_cmd(&dir);
    cmd.arg("sessions").arg("delete").arg(&prefix);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Deleted session"));

    let store = SessionStore::new(&db_path).unwrap();
    assert!(store.load().is_empty());
}

#[test]
fn test_sessions_delete_unknown_id_fails() {
    let dir = TempDir::new().unwrap();

    let mut cmd = kavira_cmd(&dir);
    cmd.arg("sessions").arg("delete").arg("deadbeef");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No session matches"));
}

#[test]
fn test_unreadable_config_file_fails() {
    let dir = TempDir::new().unwrap();

    let mut cmd = kavira_cmd(&dir);
    cmd.arg("--config")
        .arg(dir.path().join("missing.yaml"))
        .arg("sessions")
        .arg("list");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_invalid_tts_engine_in_config_fails() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.yaml");
    std::fs::write(&config_path, "tts:\n  engine: robotic\n").unwrap();

    let mut cmd = kavira_cmd(&dir);
    cmd.arg("--config").arg(&config_path).arg("sessions").arg("list");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid tts.engine"));
}

#[test]
fn test_imagine_without_api_key_fails() {
    let dir = TempDir::new().unwrap();

    let mut cmd = kavira_cmd(&dir);
    cmd.env_remove("KAVIRA_API_KEY")
        .env_remove("GEMINI_API_KEY")
        .arg("imagine")
        .arg("a lighthouse");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("KAVIRA_API_KEY"));
}
