//! Smoke test for the `conductord` binary's startup failure path, in the
//! style of `assert_cmd`-driven CLI tests (cf. golem-cli's `tests/worker_files.rs`).

use assert_cmd::Command;
use predicates::str::contains;

/// With no `CONFIG_PATH` and no `conductord.toml` in the working directory,
/// the binary must exit non-zero with a message pointing at how to fix it,
/// rather than panicking or hanging on a bind attempt.
#[test]
fn exits_with_error_when_no_config_is_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("conductord").unwrap();
    cmd.current_dir(dir.path()).env_remove("CONFIG_PATH");
    cmd.assert().failure().stderr(contains("configuration required"));
}
