//! End-to-end tests for the `tfd` binary.
//!
//! Each test works in its own temporary directory so output files and
//! `tfd.toml` lookups never leak between tests.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const DOC: &str = "Intro.\n\n# Greeting\n```python:testflows\nname = \"world\"\nprint(f\"hello {name}\")\n```\nBye.\n";

const FAILING: &str = "# A\n```python:testflows\nx = 1\nraise ValueError(\"bad\")\n```\nafter\n# B\ntail\n";

fn tfd(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("tfd");
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}

#[test]
fn help_exits_0_with_description() {
    let dir = TempDir::new().unwrap();
    tfd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Executable document runner"));
}

#[test]
fn writes_markdown_next_to_input() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("doc.tfd"), DOC).unwrap();

    tfd(&dir).arg("doc.tfd").assert().success();

    let output = fs::read_to_string(dir.path().join("doc.md")).unwrap();
    assert_eq!(output, "Intro.\n\n# Greeting\nhello world\nBye.\n");
}

#[test]
fn explicit_run_subcommand() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("doc.tfd"), DOC).unwrap();

    tfd(&dir)
        .args(["run", "doc.tfd", "-o", "-"])
        .assert()
        .success()
        .stdout("Intro.\n\n# Greeting\nhello world\nBye.\n");
}

#[test]
fn stdin_goes_to_stdout() {
    let dir = TempDir::new().unwrap();
    tfd(&dir)
        .arg("-")
        .write_stdin("```python:testflows\nprint(__file__)\n```\n")
        .assert()
        .success()
        .stdout("<document:1>\n");
}

#[test]
fn refuses_to_overwrite_without_force() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("doc.tfd"), DOC).unwrap();
    fs::write(dir.path().join("doc.md"), "old").unwrap();

    tfd(&dir)
        .arg("doc.tfd")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(fs::read_to_string(dir.path().join("doc.md")).unwrap(), "old");

    tfd(&dir).args(["doc.tfd", "-f"]).assert().success();
    assert!(
        fs::read_to_string(dir.path().join("doc.md"))
            .unwrap()
            .contains("hello world")
    );
}

#[test]
fn refuses_input_output_collision() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.md"), DOC).unwrap();

    tfd(&dir)
        .args(["notes.md", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("same file"));
}

#[test]
fn fragment_error_reports_document_line() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.tfd"), FAILING).unwrap();

    tfd(&dir)
        .args(["bad.tfd", "-o", "-"])
        .assert()
        .code(1)
        .stdout("# A\n")
        .stderr(predicate::str::contains("runtime error: ValueError: bad"))
        .stderr(predicate::str::contains("4|> raise ValueError(\"bad\")"));
}

#[test]
fn on_error_continue_keeps_going_but_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.tfd"), FAILING).unwrap();

    tfd(&dir)
        .args(["bad.tfd", "-o", "-", "--on-error", "continue"])
        .assert()
        .code(1)
        .stdout("# A\nafter\n# B\ntail\n");
}

#[test]
fn config_file_sets_error_action() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.tfd"), FAILING).unwrap();
    fs::write(dir.path().join("tfd.toml"), "on_error = \"skip-section\"\n").unwrap();

    tfd(&dir)
        .args(["bad.tfd", "-o", "-"])
        .assert()
        .code(1)
        .stdout("# A\n# B\ntail\n");

    // The flag wins over the file.
    tfd(&dir)
        .args(["bad.tfd", "-o", "-", "--on-error", "halt"])
        .assert()
        .code(1)
        .stdout("# A\n");
}

#[test]
fn check_parses_without_running() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("doc.tfd"), DOC).unwrap();

    tfd(&dir)
        .args(["--check", "doc.tfd"])
        .assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("parsed successfully"));
    assert!(!dir.path().join("doc.md").exists());
}

#[test]
fn unclosed_fence_fails_to_parse() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("open.tfd"), "# A\n```python:testflows\nx = 1\n").unwrap();

    tfd(&dir)
        .args(["open.tfd", "-o", "-"])
        .assert()
        .code(1)
        .stdout("");
}

#[test]
fn empty_input_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("empty.tfd"), "").unwrap();

    tfd(&dir)
        .args(["empty.tfd", "-o", "-"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("empty document"));
}

#[test]
fn dot_output_writes_beside_input_not_cwd() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("docs")).unwrap();
    fs::create_dir(dir.path().join("work")).unwrap();
    fs::write(dir.path().join("docs/guide.tfd"), DOC).unwrap();

    let mut cmd = cargo_bin_cmd!("tfd");
    cmd.current_dir(dir.path().join("work"))
        .env_remove("RUST_LOG")
        .args(["--no-color", "../docs/guide.tfd", "-o", "."])
        .assert()
        .success();

    assert!(dir.path().join("docs/guide.md").exists());
    assert!(!dir.path().join("work/guide.md").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("docs/guide.md")).unwrap(),
        "Intro.\n\n# Greeting\nhello world\nBye.\n"
    );
}

#[test]
fn multiple_inputs_into_directory() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("out")).unwrap();
    fs::write(dir.path().join("a.tfd"), "# A\n").unwrap();
    fs::write(dir.path().join("b.tfd"), "# B\n").unwrap();

    tfd(&dir)
        .args(["a.tfd", "b.tfd", "-o", "out"])
        .assert()
        .success();
    assert_eq!(fs::read_to_string(dir.path().join("out/a.md")).unwrap(), "# A\n");
    assert_eq!(fs::read_to_string(dir.path().join("out/b.md")).unwrap(), "# B\n");
}
