use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_offline_chat_round_trip() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("weft")
        .env("WEFT_HOME", dir.path())
        .write_stdin("/connect irc.example.org nickly\n/join #general\nhello world\n/quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("connected to irc.example.org"))
        .stdout(predicate::str::contains("[#general] <nickly> hello world"))
        .stdout(predicate::str::contains("goodbye"));
}

#[test]
fn test_stdin_eof_ends_the_session() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("weft")
        .env("WEFT_HOME", dir.path())
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("goodbye"));
}
