use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use assert_cmd::Command;
use std::time::Duration;
use tempfile::tempdir;

// Short timings so open/close settle in about a second in sim mode
fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let state_dir = dir.join("state");
    let toml = format!(
        r#"
name = "Test Door"

[pins]
open = 17
state = 27

[output]
emit_ms = 1

[timing]
execution_s = 1
opening_delay_s = 1

[storage]
dir = "{}"
{extra}
"#,
        state_dir.display()
    );
    let path = dir.join("garage.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn garage(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("garage_cli").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd.timeout(Duration::from_secs(20));
    cmd
}

fn json_status(cfg: &Path, args: &[&str]) -> serde_json::Value {
    let out = garage(cfg).arg("--json").args(args).output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout).unwrap();
    let line = stdout.lines().last().unwrap();
    serde_json::from_str(line).unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "ok", "stdout")]
#[case(&["status"], 0, "current=closed target=closed", "stdout")]
#[case(&["bogus"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");

    let assert = garage(&cfg).args(args).assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn open_then_close_round_trip_is_persisted() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");

    let v = json_status(&cfg, &["open"]);
    assert_eq!(v["current"], "open");
    assert_eq!(v["target"], "open");
    assert_eq!(v["name"], "Test Door");

    let v = json_status(&cfg, &["status"]);
    assert_eq!(v["current"], "open");
    assert_eq!(
        fs::read_to_string(dir.path().join("state/currentDoorState")).unwrap(),
        "0"
    );

    let v = json_status(&cfg, &["close"]);
    assert_eq!(v["current"], "closed");
    assert_eq!(v["obstruction"], false);
}

#[test]
fn interrupted_close_is_finished_on_next_start() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    let state = dir.path().join("state");
    fs::create_dir_all(&state).unwrap();
    fs::write(state.join("currentDoorState"), "3").unwrap();
    fs::write(state.join("targetDoorState"), "1").unwrap();

    let v = json_status(&cfg, &["status"]);
    assert_eq!(v["current"], "closing");

    let v = json_status(&cfg, &["close"]);
    assert_eq!(v["current"], "closed");
    assert_eq!(v["target"], "closed");
}

#[test]
fn input_tracking_skips_redundant_open() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "[input]\nenabled = true\n");

    // Sensor reads open at startup, so the command is a no-op
    let out = garage(&cfg)
        .env("GARAGE_SIM_INPUT", "1")
        .arg("--json")
        .arg("open")
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value =
        serde_json::from_str(String::from_utf8(out.stdout).unwrap().trim()).unwrap();
    assert_eq!(v["current"], "open");
}

#[rstest]
#[case("[pins]\nopen = 17\nclose = 18\n", "pins.close")]
#[case("[pins]\nopen = 17\n[input]\nenabled = true\n", "pins.state is missing")]
#[case("[pins]\nopen = 17\n[output]\nemit_ms = 0\n", "emit_ms")]
#[case("[pins]\nopen = 17\n[webhook]\nenabled = true\njson_path = \"nope\"\n", "json_path")]
fn invalid_config_exits_with_code_2(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, toml).unwrap();

    garage(&cfg)
        .arg("status")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid configuration"))
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_is_a_config_error_in_json() {
    let dir = tempdir().unwrap();
    let out = garage(&dir.path().join("absent.toml"))
        .arg("--json")
        .arg("status")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    let v: serde_json::Value =
        serde_json::from_str(String::from_utf8(out.stderr).unwrap().trim()).unwrap();
    assert_eq!(v["reason"], "Config");
}

#[test]
fn run_serves_stdin_commands_until_quit() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");

    garage(&cfg)
        .arg("--json")
        .arg("run")
        .write_stdin("open\nstatus\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""current":"opening""#))
        .stdout(predicate::str::contains(r#""target":"open""#));
}
