// CLI integration tests for one-shot table commands and the shell.
use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::Value;

fn cmd(dir: &std::path::Path) -> Command {
    let exe = env!("CARGO_BIN_EXE_tabfile");
    let mut command = Command::new(exe);
    command.args(["--dir", dir.to_str().unwrap()]);
    command
}

fn parse_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("valid json")
}

fn parse_json_lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

#[test]
fn create_append_dump_column_flow() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().join("tables");

    let create = cmd(&dir)
        .args(["create", "t", "a", "b"])
        .output()
        .expect("create");
    assert!(create.status.success());
    let created = parse_json(&create.stdout);
    assert_eq!(created["created"]["table"], "t.csv");
    assert!(created["created"]["path"].as_str().unwrap().ends_with("t.csv"));

    let wide = cmd(&dir)
        .args(["append", "t", "x", "y", "z"])
        .output()
        .expect("append");
    assert!(wide.status.success());
    let appended = parse_json(&wide.stdout);
    assert_eq!(appended["row"], serde_json::json!(["x", "y"]));
    assert_eq!(appended["truncated"], true);
    let notice = parse_json(&wide.stderr);
    assert_eq!(notice["notice"]["kind"], "arity");
    assert_eq!(notice["notice"]["details"]["dropped"][0], "z");

    let short = cmd(&dir)
        .args(["append", "t", "p"])
        .output()
        .expect("append");
    assert!(short.status.success());
    assert_eq!(parse_json(&short.stdout)["truncated"], false);

    let dump = cmd(&dir).args(["dump", "t"]).output().expect("dump");
    assert!(dump.status.success());
    assert_eq!(
        parse_json_lines(&dump.stdout),
        vec![
            serde_json::json!(["a", "b"]),
            serde_json::json!(["x", "y"]),
            serde_json::json!(["p"]),
        ]
    );

    let column = cmd(&dir)
        .args(["column", "t", "a"])
        .output()
        .expect("column");
    assert!(column.status.success());
    assert_eq!(parse_json(&column.stdout)["values"], serde_json::json!(["p", "x"]));

    let head = cmd(&dir).args(["head", "t.csv"]).output().expect("head");
    assert!(head.status.success());
    let header = parse_json(&head.stdout);
    assert_eq!(header["columns"], serde_json::json!(["a", "b"]));
    assert_eq!(header["encoding"], "utf-8");
}

#[test]
fn second_create_gets_suffixed_name() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path();

    for expected in ["t.csv", "t(1).csv"] {
        let create = cmd(dir)
            .args(["create", "t", "a"])
            .output()
            .expect("create");
        assert!(create.status.success());
        assert_eq!(parse_json(&create.stdout)["created"]["table"], expected);
    }

    let list = cmd(dir).arg("list").output().expect("list");
    let tables = parse_json(&list.stdout);
    assert_eq!(tables["tables"].as_array().unwrap().len(), 2);
}

#[test]
fn error_kinds_map_to_exit_codes() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path();
    assert!(cmd(dir).args(["create", "t", "a"]).output().unwrap().status.success());

    let missing_table = cmd(dir).args(["head", "ghost"]).output().expect("head");
    assert_eq!(missing_table.status.code().unwrap(), 3);
    let err = parse_json(&missing_table.stderr);
    assert_eq!(err["error"]["kind"], "TableNotFound");
    assert_eq!(err["error"]["table"], "ghost.csv");

    let missing_column = cmd(dir)
        .args(["column", "t", "nope"])
        .output()
        .expect("column");
    assert_eq!(missing_column.status.code().unwrap(), 4);

    let usage = cmd(dir).args(["create", "t"]).output().expect("create");
    assert_eq!(usage.status.code().unwrap(), 2);
}

#[test]
fn shell_reads_commands_from_stdin() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut child = cmd(temp.path())
        .arg("shell")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn shell");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"create_table t a b\nselect_table t\ninput 1 2\nview_table_head\n")
        .expect("write script");
    let output = child.wait_with_output().expect("shell output");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Table created with name: t.csv"));
    assert!(stdout.contains("Input successful: [\"1\",\"2\"]"));
    assert!(stdout.contains("Table columns: [\"a\",\"b\"]"));
}

#[test]
fn color_always_tints_json_output() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path();
    assert!(cmd(dir).args(["create", "t", "a"]).output().unwrap().status.success());

    let plain = cmd(dir).args(["--color", "never", "list"]).output().expect("list");
    assert!(!String::from_utf8_lossy(&plain.stdout).contains('\u{1b}'));

    let colored = cmd(dir).args(["--color", "always", "list"]).output().expect("list");
    assert!(colored.status.success());
    let stdout = String::from_utf8_lossy(&colored.stdout);
    assert!(stdout.contains("\u{1b}[36m\"tables\"\u{1b}[0m"));
    assert!(stdout.contains("\u{1b}[32m\"t.csv\"\u{1b}[0m"));
}
