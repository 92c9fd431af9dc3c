//! Runs the `knit` binary against temporary documents

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const DOC: &str = "# Sums\n\n```calc exec\nx = 2\nx * 21\n```\n";

fn knit(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_knit"))
        .current_dir(dir)
        .env("RUST_LOG", "off")
        .args(args)
        .output()
        .expect("knit runs")
}

#[test]
fn render_prints_to_stdout() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sums.md"), DOC).unwrap();

    let output = knit(dir.path(), &["render", "sums.md"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "# Sums\n\n```calc exec\nx = 2\nx * 21\n```\n```result\n42\n```\n"
    );
}

#[test]
fn render_writes_into_out_dir() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.md"), DOC).unwrap();
    fs::write(dir.path().join("b.md"), "```calc exec\nprint(\"b\")\n```\n").unwrap();

    let output = knit(dir.path(), &["render", "a.md", "b.md", "--out-dir", "out"]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let b = fs::read_to_string(dir.path().join("out/b.md")).unwrap();
    assert_eq!(b, "```calc exec\nprint(\"b\")\n```\n```output\nb\n```\n");
    assert!(dir.path().join("out/a.md").is_file());
}

#[test]
fn out_dir_refuses_inputs_sharing_a_file_name() {
    let dir = TempDir::new().unwrap();
    for sub in ["a", "b"] {
        fs::create_dir(dir.path().join(sub)).unwrap();
        fs::write(dir.path().join(sub).join("x.md"), DOC).unwrap();
    }

    let output = knit(dir.path(), &["render", "a/x.md", "b/x.md", "--out-dir", "out"]);
    assert!(!output.status.success());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn check_fails_on_failed_fragments() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ok.md"), DOC).unwrap();
    fs::write(dir.path().join("bad.md"), "```calc exec\nmissing + 1\n```\n").unwrap();

    assert!(knit(dir.path(), &["check", "ok.md"]).status.success());

    let output = knit(dir.path(), &["check", "ok.md", "bad.md"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("name 'missing' is not defined"), "{stderr}");
}

#[test]
fn settings_file_is_picked_up() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("knit.toml"), "show_result = false\n").unwrap();
    fs::write(dir.path().join("sums.md"), DOC).unwrap();

    let output = knit(dir.path(), &["render", "sums.md"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "# Sums\n\n```calc exec\nx = 2\nx * 21\n```\n"
    );
}

#[test]
fn bad_settings_are_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.toml"), "default_group = \"\"\n").unwrap();
    fs::write(dir.path().join("sums.md"), DOC).unwrap();

    let output = knit(dir.path(), &["render", "sums.md", "--config", "bad.toml"]);
    assert!(!output.status.success());
}

#[test]
fn missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let output = knit(dir.path(), &["render", "nope.md"]);
    assert!(!output.status.success());
}
