// CLI integration tests for the resolve/expand flows.
use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_bodyvars");
    Command::new(exe)
}

fn run_with_stdin(mut command: Command, stdin: &[u8]) -> std::process::Output {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .as_mut()
        .expect("stdin")
        .write_all(stdin)
        .expect("write stdin");
    child.wait_with_output().expect("wait")
}

fn stderr_error(output: &std::process::Output) -> Value {
    let text = String::from_utf8_lossy(&output.stderr);
    let line = text.lines().next().expect("json line on stderr");
    serde_json::from_str(line).expect("valid json on stderr")
}

#[test]
fn resolve_prints_the_addressed_value() {
    let temp = tempfile::tempdir().expect("tempdir");
    let doc = temp.path().join("doc.json");
    std::fs::write(&doc, r#"{"ref":{"joe":[1,2,{"sum":100}]}}"#).expect("write doc");

    let output = cmd()
        .args(["resolve", "ref.joe.2.sum", "--file", doc.to_str().unwrap()])
        .output()
        .expect("resolve");
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).expect("json stdout");
    assert_eq!(value, serde_json::json!(100));
}

#[test]
fn resolve_reads_stdin_when_no_file_given() {
    let output = run_with_stdin(
        {
            let mut command = cmd();
            command.args(["resolve", "user.name"]);
            command
        },
        br#"{"user":{"name":"lee"}}"#,
    );
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).expect("json stdout");
    assert_eq!(value, serde_json::json!("lee"));
}

#[test]
fn resolve_missing_path_exits_not_found() {
    let output = run_with_stdin(
        {
            let mut command = cmd();
            command.args(["resolve", "nope"]);
            command
        },
        br#"{"a":1}"#,
    );
    assert_eq!(output.status.code(), Some(3));
    let err = stderr_error(&output);
    assert_eq!(err["error"]["kind"], "NotFound");
}

#[test]
fn resolve_distinguishes_null_from_missing() {
    let output = run_with_stdin(
        {
            let mut command = cmd();
            command.args(["resolve", "a"]);
            command
        },
        br#"{"a":null}"#,
    );
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "null");
}

#[test]
fn resolve_malformed_document_exits_decode() {
    let output = run_with_stdin(
        {
            let mut command = cmd();
            command.args(["resolve", "a"]);
            command
        },
        b"{oops",
    );
    assert_eq!(output.status.code(), Some(4));
    let err = stderr_error(&output);
    assert_eq!(err["error"]["kind"], "Decode");
    assert!(
        err["error"]["hint"]
            .as_str()
            .unwrap_or_default()
            .contains("parse category:")
    );
}

#[test]
fn expand_renders_placeholders() {
    let output = run_with_stdin(
        {
            let mut command = cmd();
            command.args(["expand", "hello {json.user.name}, n={json.n}, {missing}"]);
            command
        },
        br#"{"user":{"name":"lee"},"n":2}"#,
    );
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim_end(),
        "hello lee, n=2, {missing}"
    );
}
