//! Integration tests for quadrant
//!
//! These drive the binary end to end with the local identity provider and a
//! throwaway data directory.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// A quadrant Command isolated in `dir`, signed in through the local provider.
fn quadrant(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("quadrant");
    cmd.current_dir(dir.path())
        .arg("--config")
        .arg(dir.path().join("quadrant.toml"))
        .env("QUADRANT_AUTH_PROVIDER", "local")
        .env("QUADRANT_USER", "ada")
        .env("QUADRANT_DATA_DIR", dir.path().join("data"))
        .env_remove("QUADRANT_CONFIG")
        .env_remove("QUADRANT_CLIENT_ID")
        .env("RUST_LOG", "warn");
    cmd
}

fn create_temp_home() -> TempDir {
    TempDir::new().unwrap()
}

fn login(dir: &TempDir) {
    quadrant(dir).arg("login").assert().success();
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_quadrant_help() {
        let dir = create_temp_home();
        quadrant(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("add"))
            .stdout(predicate::str::contains("serve"));
    }

    #[test]
    fn test_quadrant_version() {
        let dir = create_temp_home();
        quadrant(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("quadrant"));
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        let dir = create_temp_home();
        quadrant(&dir).arg("frobnicate").assert().failure();
    }

    #[test]
    fn test_invalid_provider_env_fails() {
        let dir = create_temp_home();
        quadrant(&dir)
            .env("QUADRANT_AUTH_PROVIDER", "carrier-pigeon")
            .arg("whoami")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid auth provider"));
    }
}

// =============================================================================
// Session Tests
// =============================================================================

mod session {
    use super::*;

    #[test]
    fn test_whoami_when_signed_out() {
        let dir = create_temp_home();
        quadrant(&dir)
            .arg("whoami")
            .assert()
            .success()
            .stdout(predicate::str::contains("Not signed in"));
    }

    #[test]
    fn test_login_persists_session() {
        let dir = create_temp_home();
        quadrant(&dir)
            .arg("login")
            .assert()
            .success()
            .stdout(predicate::str::contains("Signed in as"));

        assert!(dir.path().join("data/session.json").exists());

        quadrant(&dir)
            .arg("whoami")
            .assert()
            .success()
            .stdout(predicate::str::contains("ada"))
            .stdout(predicate::str::contains("local"));

        quadrant(&dir)
            .arg("login")
            .assert()
            .success()
            .stdout(predicate::str::contains("Already signed in"));
    }

    #[test]
    fn test_logout_forgets_session() {
        let dir = create_temp_home();
        login(&dir);

        quadrant(&dir)
            .arg("logout")
            .assert()
            .success()
            .stdout(predicate::str::contains("Signed out"));
        assert!(!dir.path().join("data/session.json").exists());

        // Idempotent.
        quadrant(&dir).arg("logout").assert().success();

        quadrant(&dir)
            .arg("whoami")
            .assert()
            .success()
            .stdout(predicate::str::contains("Not signed in"));
    }

    #[test]
    fn test_device_login_without_client_id_fails() {
        let dir = create_temp_home();
        quadrant(&dir)
            .env("QUADRANT_AUTH_PROVIDER", "device")
            .arg("login")
            .assert()
            .failure()
            .stderr(predicate::str::contains("not configured"));
    }
}

// =============================================================================
// Task Command Tests
// =============================================================================

mod tasks {
    use super::*;

    #[test]
    fn test_task_commands_require_sign_in() {
        let dir = create_temp_home();
        quadrant(&dir)
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("quadrant login"));
    }

    #[test]
    fn test_empty_list() {
        let dir = create_temp_home();
        login(&dir);
        quadrant(&dir)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("Inga uppgifter"));
    }

    #[test]
    fn test_add_and_list() {
        let dir = create_temp_home();
        login(&dir);

        quadrant(&dir)
            .args(["add", "Buy milk"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Viktigt, bråttom"));
        quadrant(&dir)
            .args(["add", "Plan trip", "--category", "2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Viktigt, inte bråttom"));

        quadrant(&dir)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("1. [ ] Buy milk"))
            .stdout(predicate::str::contains("2. [ ] Plan trip"));
    }

    #[test]
    fn test_add_prints_a_usable_short_id() {
        let dir = create_temp_home();
        login(&dir);

        let output = quadrant(&dir).args(["add", "Buy milk"]).output().unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8(output.stdout).unwrap();
        let short = stdout
            .rsplit_once('(')
            .and_then(|(_, rest)| rest.split_once(')'))
            .map(|(id, _)| id.to_string())
            .unwrap();
        assert_eq!(short.chars().count(), 8);

        quadrant(&dir)
            .args(["done", &short])
            .assert()
            .success()
            .stdout(predicate::str::contains("Buy milk"));
    }

    #[test]
    fn test_add_rejects_blank_text_and_bad_category() {
        let dir = create_temp_home();
        login(&dir);

        quadrant(&dir)
            .args(["add", "   "])
            .assert()
            .failure()
            .stderr(predicate::str::contains("must not be empty"));
        quadrant(&dir)
            .args(["add", "x", "-c", "someday"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid category"));
    }

    #[test]
    fn test_done_undo_and_clear() {
        let dir = create_temp_home();
        login(&dir);
        quadrant(&dir).args(["add", "Buy milk"]).assert().success();
        quadrant(&dir).args(["add", "Call mom"]).assert().success();

        quadrant(&dir)
            .args(["done", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Buy milk"));
        quadrant(&dir)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("[x] Buy milk"));

        // Completing again writes nothing.
        quadrant(&dir)
            .args(["done", "2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Already completed"));

        quadrant(&dir)
            .args(["undo", "2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Buy milk"));
        quadrant(&dir).args(["done", "1"]).assert().success();

        quadrant(&dir)
            .arg("clear")
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 1"));
        quadrant(&dir)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("Call mom"))
            .stdout(predicate::str::contains("Buy milk").not());
    }

    #[test]
    fn test_move_and_edit() {
        let dir = create_temp_home();
        login(&dir);
        quadrant(&dir).args(["add", "Buy milk"]).assert().success();

        quadrant(&dir)
            .args(["move", "1", "4"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Inte bråttom, inte viktigt"));
        quadrant(&dir)
            .args(["move", "1", "inte_bratttom_inte_viktigt"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Already in"));

        quadrant(&dir)
            .args(["edit", "1", "--text", "Buy oat milk"])
            .assert()
            .success();
        quadrant(&dir)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("Buy oat milk"))
            .stdout(predicate::str::contains("Inte bråttom, inte viktigt"));

        quadrant(&dir)
            .args(["edit", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Nothing to change"));
    }

    #[test]
    fn test_unknown_task_reference() {
        let dir = create_temp_home();
        login(&dir);
        quadrant(&dir)
            .args(["done", "zz"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No task matches 'zz'"));
    }

    #[test]
    fn test_tasks_are_scoped_to_user() {
        let dir = create_temp_home();
        login(&dir);
        quadrant(&dir).args(["add", "Ada's task"]).assert().success();
        quadrant(&dir).arg("logout").assert().success();

        quadrant(&dir).env("QUADRANT_USER", "grace").arg("login").assert().success();
        quadrant(&dir)
            .env("QUADRANT_USER", "grace")
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("Inga uppgifter"));
    }
}

// =============================================================================
// Interactive Board Tests
// =============================================================================

mod board {
    use super::*;

    #[test]
    fn test_board_reads_commands_from_stdin() {
        let dir = create_temp_home();
        login(&dir);

        quadrant(&dir)
            .arg("board")
            .write_stdin("add Buy milk\nquit\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("Att göra"));

        quadrant(&dir)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("Buy milk"));
    }

    #[test]
    fn test_board_shows_login_when_signed_out() {
        let dir = create_temp_home();
        quadrant(&dir)
            .arg("board")
            .write_stdin("")
            .assert()
            .success()
            .stdout(predicate::str::contains("Logga in"));
    }
}

// =============================================================================
// Config Tests
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_init_writes_file() {
        let dir = create_temp_home();
        quadrant(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created"));

        let content = fs::read_to_string(dir.path().join("quadrant.toml")).unwrap();
        assert!(content.contains("[auth]"));
        assert!(content.contains("port = 7878"));

        quadrant(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_config_show_reports_effective_paths() {
        let dir = create_temp_home();
        quadrant(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("using defaults"))
            .stdout(predicate::str::contains("tasks.db"));
    }

    #[test]
    fn test_config_validate_warns_about_missing_client_id() {
        let dir = create_temp_home();
        fs::write(
            dir.path().join("quadrant.toml"),
            "[auth]\nprovider = \"device\"\n",
        )
        .unwrap();
        quadrant(&dir)
            .env_remove("QUADRANT_AUTH_PROVIDER")
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("client_id"));
    }

    #[test]
    fn test_config_file_port_is_used() {
        let dir = create_temp_home();
        fs::write(dir.path().join("quadrant.toml"), "[server]\nport = 9999\n").unwrap();
        quadrant(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("port = 9999"));
    }
}
