//! CLI integration tests for rebind run / explain / parse.
//!
//! These tests invoke the compiled binary to verify end-to-end behavior.

use std::path::PathBuf;
use std::process::{Command, Output};

fn rebind_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rebind"))
}

/// Write `src` into a fresh temp dir; the dir must outlive the run.
fn script(src: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = dir.path().join("script.rebind");
    std::fs::write(&file, src).expect("write source");
    (dir, file)
}

fn rebind(args: &[&str], file: &PathBuf) -> Output {
    let mut cmd = rebind_bin();
    cmd.args(args).arg(file);
    cmd.output().expect("run binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const HELLO: &str = r#"
sig (greeting: String, name: String) -> String;
drop name;
insert 1 name: String = "world";
invoke static Strings::concat;
call ("Hello, ", "ignored");
"#;

const FINALLY: &str = r#"
sig (s: String) -> String;
finally Log::note;
invoke static Errors::fail;
call ("boom");
"#;

#[test]
fn cli_run_prints_calls() {
    let (_dir, file) = script(HELLO);
    let output = rebind(&["run"], &file);
    assert!(
        output.status.success(),
        "rebind run should succeed, stderr: {}",
        stderr(&output)
    );
    assert_eq!(stdout(&output), "call(\"Hello, \", \"ignored\") = \"Hello, world\"\n");
}

#[test]
fn cli_run_reports_thrown_calls_and_notes() {
    let (_dir, file) = script(FINALLY);
    for flags in [&["run"][..], &["run", "--emulate-try-finally"][..]] {
        let output = rebind(flags, &file);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(
            stdout(&output),
            "note: boom\ncall(\"boom\") threw IllegalStateException: boom\n",
            "flags: {flags:?}"
        );
    }
}

#[test]
fn cli_explain_pretty() {
    let (_dir, file) = script(HELLO);
    let output = rebind(&["explain"], &file);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("composition 1: (greeting: String, name: String) -> String"), "{out}");
    assert!(out.contains("endpoint: invoke static Strings::concat"), "{out}");
    assert!(out.contains("drop_arguments"), "{out}");
    assert!(!out.contains("Hello, world"), "explain must not call: {out}");
}

#[test]
fn cli_explain_json_shows_the_strategy() {
    let (_dir, file) = script(FINALLY);
    let output = rebind(&["explain", "--format", "json", "--emulate-try-finally"], &file);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let v: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid json");
    let c = &v["compositions"][0];
    assert_eq!(c["start"], "(s: String) -> String");
    assert_eq!(c["steps"][0]["statement"], "finally Log::note;");
    assert!(c["trace"][1].as_str().unwrap().starts_with("try_finally"), "{c}");
}

#[test]
fn cli_parse_json() {
    let (_dir, file) = script("drop x;");
    let output = rebind(&["parse", "--format", "json"], &file);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let v: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid json");
    assert_eq!(v["stmts"][0]["kind"]["Drop"]["text"], "x");
}

#[test]
fn cli_parse_error_has_a_span() {
    let (_dir, file) = script("sig () -> void");
    let output = rebind(&["parse"], &file);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("expected Semicolon"), "{}", stderr(&output));
}

#[test]
fn cli_run_composition_error_fails() {
    let (_dir, file) = script("sig (a: String) -> String; drop b;");
    let output = rebind(&["run"], &file);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("drop b;"), "{err}");
    assert!(err.contains("argument or pattern 'b' not found"), "{err}");
}

#[test]
fn cli_rejects_oversized_source() {
    let (_dir, file) = script(&"// padding\n".repeat(100_000));
    let output = rebind(&["run"], &file);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("exceeds 1MB limit"), "{}", stderr(&output));
}

#[test]
fn cli_missing_file_fails() {
    let output = rebind_bin()
        .args(["run", "/nonexistent/script.rebind"])
        .output()
        .expect("run binary");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to read"), "{}", stderr(&output));
}
