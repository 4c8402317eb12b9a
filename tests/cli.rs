//! Integration tests for the codeweave CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Binary running inside `dir` with user config and environment isolated.
fn codeweave(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("codeweave").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn main_py() -> String {
    (1..=10).map(|i| format!("print({i})\n")).collect()
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("codeweave")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Weave the source files"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("codeweave")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("codeweave"));
}

#[test]
fn test_languages_lists_registry() {
    let temp = TempDir::new().unwrap();
    codeweave(temp.path())
        .arg("languages")
        .assert()
        .success()
        .stdout(predicate::str::contains("python").and(predicate::str::contains(".ipynb")));
}

#[test]
fn test_excluded_directory_never_appears() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "repo/src/main.py", &main_py());
    write(temp.path(), "repo/.venv/lib/x.py", "import os\n");

    let assert = codeweave(temp.path())
        .args(["weave", "repo", "--lang", "python", "--excluded-dirs", ".venv", "--stdout"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    assert_eq!(stdout, format!("# File: src/main.py\n{}\n", main_py()));
    assert!(!stdout.contains(".venv"));
}

#[test]
fn test_default_output_path() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "repo/app.py", "x = 1  # set x\n");

    codeweave(temp.path())
        .args(["weave", "repo", "--lang", "python,markdown"])
        .assert()
        .success()
        .stderr(predicate::str::contains("repo_python,markdown.txt"));

    let written = fs::read_to_string(temp.path().join("outputs/repo_python,markdown.txt")).unwrap();
    assert_eq!(written, "# File: app.py\nx = 1\n\n");
}

#[cfg(unix)]
#[test]
fn test_program_output_replaces_content() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "repo/a.py", "print('hidden')\nprint('source')\n");

    codeweave(temp.path())
        .args(["weave", "repo", "--lang", "python", "--program", "python=wc -l", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# File: a.py\n# Program output:\n"))
        .stdout(predicate::str::contains("2 "))
        .stdout(predicate::str::contains("hidden").not());
}

#[test]
fn test_no_matching_files_exits_with_no_content() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "repo/app.py", "print(1)\n");

    codeweave(temp.path())
        .args(["weave", "repo", "--lang", "rust"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no source code found"));

    assert!(!temp.path().join("outputs").exists());
}

#[test]
fn test_identical_runs_are_byte_identical() {
    let temp = TempDir::new().unwrap();
    for i in 0..50 {
        write(
            temp.path(),
            &format!("repo/pkg{}/mod_{i:02}.py", i % 4),
            &format!("\"\"\"Module {i}.\"\"\"\nVALUE = {i}  # constant\n"),
        );
    }

    for (output, mode) in [("a.txt", "sequential"), ("b.txt", "parallel"), ("c.txt", "parallel")] {
        codeweave(temp.path())
            .args(["weave", "repo", "--mode", mode, "--threads", "4", "--output", output])
            .assert()
            .success();
    }

    let a = fs::read(temp.path().join("a.txt")).unwrap();
    assert_eq!(a, fs::read(temp.path().join("b.txt")).unwrap());
    assert_eq!(a, fs::read(temp.path().join("c.txt")).unwrap());
    assert!(String::from_utf8(a).unwrap().starts_with("# File: pkg0/mod_00.py\nVALUE = 0\n"));
}

#[test]
fn test_exclude_wins_over_include() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "repo/src/app.py", "A = 1\n");
    write(temp.path(), "repo/src/gen/model.py", "B = 2\n");
    write(temp.path(), "repo/setup.py", "C = 3\n");

    codeweave(temp.path())
        .args(["weave", "repo", "--include", "src", "--exclude", "src/gen", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::eq("# File: src/app.py\nA = 1\n\n"));
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_a_warning() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    write(temp.path(), "repo/locked/secret.py", "S = 1\n");
    write(temp.path(), "repo/open.py", "O = 1\n");
    let locked = temp.path().join("repo/locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can list the directory anyway
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    codeweave(temp.path())
        .args(["weave", "repo", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# File: open.py"))
        .stderr(predicate::str::contains("cannot read directory 'locked'"));

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn test_remote_inputs_are_rejected() {
    let temp = TempDir::new().unwrap();
    codeweave(temp.path())
        .args(["weave", "https://github.com/example/project"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unsupported input"));
}

#[test]
fn test_dry_run_lists_candidates_without_writing() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "repo/b.py", "B = 1\n");
    write(temp.path(), "repo/a/z.py", "Z = 1\n");
    write(temp.path(), "repo/a.md", "# notes\n");

    codeweave(temp.path())
        .args(["weave", "repo", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::eq("b.py\na/z.py\n"));
    assert!(!temp.path().join("outputs").exists());
}

#[test]
fn test_config_show_reflects_layers() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("codeweave.toml"),
        "[transform]\ntop_n = 7\n",
    )
    .unwrap();

    codeweave(temp.path())
        .args(["config", "show", "--format", "json"])
        .env("CODEWEAVE_FILTER__LANGUAGES", "[go]")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"top_n\": 7"))
        .stdout(predicate::str::contains("\"go\""));
}

#[test]
fn test_unknown_language_is_a_configuration_error() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "repo/app.py", "print(1)\n");

    codeweave(temp.path())
        .args(["weave", "repo", "--lang", "cobol"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unrecognized language 'cobol'"));
}
