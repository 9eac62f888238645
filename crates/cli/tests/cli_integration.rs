//! CLI integration tests for every subcommand.
//!
//! Uses `assert_cmd` to spawn the `gramex` binary and verify exit codes,
//! stdout content, and stderr content. Each test writes its sources into
//! a fresh temp directory and runs the binary from there, so a stray
//! `gramex.toml` in the workspace never leaks in.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper: a temp dir holding `name` with `content`.
fn workspace_with(name: &str, content: &str) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join(name), content).expect("write source");
    dir
}

/// Helper: create a Command for the `gramex` binary, rooted at `dir`.
fn gramex(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("gramex");
    cmd.current_dir(dir.path());
    cmd
}

const SUM_PROGRAM: &str = "\
program summation;
var i, total : integer;
begin
  read(i);
  total := i * 2;
  write(total)
end.
";

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    let dir = TempDir::new().unwrap();
    gramex(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Grammar-driven parsing toolkit"));
}

#[test]
fn version_exits_0() {
    let dir = TempDir::new().unwrap();
    gramex(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gramex"));
}

#[test]
fn missing_file_exits_1() {
    let dir = TempDir::new().unwrap();
    gramex(&dir)
        .args(["lex", "nope.pas"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error reading file"));
}

#[test]
fn json_errors_are_objects() {
    let dir = TempDir::new().unwrap();
    let out = gramex(&dir)
        .args(["--output", "json", "lex", "nope.pas"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).expect("stderr is JSON");
    assert!(value["error"].as_str().unwrap().contains("nope.pas"));
}

#[test]
fn quiet_suppresses_error_text() {
    let dir = TempDir::new().unwrap();
    gramex(&dir)
        .args(["--quiet", "lex", "nope.pas"])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty());
}

// ──────────────────────────────────────────────
// 2. lex
// ──────────────────────────────────────────────

#[test]
fn lex_labels_identifiers_and_literals() {
    let dir = workspace_with("p.pas", "program p; x := 1");
    gramex(&dir)
        .args(["lex", "p.pas"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("program\n"))
        .stdout(predicate::str::contains("35.0\tidentifier p\n"))
        .stdout(predicate::str::contains("35.1\tidentifier x\n"))
        .stdout(predicate::str::contains(":=\n"))
        .stdout(predicate::str::contains("36.1\t<literal> 1\n"));
}

#[test]
fn lex_json_lists_tokens_and_identifiers() {
    let dir = workspace_with("p.pas", "program p;");
    let out = gramex(&dir)
        .args(["--output", "json", "lex", "p.pas"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["tokens"], serde_json::json!(["program", "35.0", ";"]));
    assert_eq!(value["identifiers"][0]["name"], "p");
}

#[test]
fn lex_unterminated_string_exits_1() {
    let dir = workspace_with("p.pas", "write('oops");
    gramex(&dir)
        .args(["lex", "p.pas"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lexical error"));
}

// ──────────────────────────────────────────────
// 3. parse
// ──────────────────────────────────────────────

#[test]
fn parse_minimal_program() {
    let dir = workspace_with("p.pas", "program p; begin end.");
    gramex(&dir)
        .args(["parse", "p.pas", "--grammar", "minimal"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("("))
        .stdout(predicate::str::contains("@$header"))
        .stdout(predicate::str::contains("#program file)"));
}

#[test]
fn parse_json_reports_types() {
    let dir = workspace_with("sum.pas", SUM_PROGRAM);
    let out = gramex(&dir)
        .args(["--output", "json", "parse", "sum.pas"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["grammar"], "pascal");
    assert_eq!(value["consumed"], value["tokens"]);
    let identifiers = value["identifiers"].as_array().unwrap();
    let total = identifiers.iter().find(|r| r["name"] == "total").unwrap();
    assert_eq!(total["type_tag"], "integer");
}

#[test]
fn parse_trailing_tokens_needs_partial() {
    let dir = workspace_with("p.pas", "program p; write(x) . extra");
    gramex(&dir)
        .args(["parse", "p.pas"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("syntax error"));
    gramex(&dir)
        .args(["parse", "p.pas", "--partial"])
        .assert()
        .success()
        .stderr(predicate::str::contains("8 of 9 tokens consumed"));
}

#[test]
fn parse_config_file_allows_partial() {
    let dir = workspace_with("p.pas", "program p; write(x) . extra");
    fs::write(
        dir.path().join("gramex.toml"),
        "[parse]\nrequire_full_consumption = false\n",
    )
    .unwrap();
    gramex(&dir).args(["parse", "p.pas"]).assert().success();
}

#[test]
fn bad_config_exits_1() {
    let dir = workspace_with("broken.toml", "[parse]\nmax_depth = \"deep\"\n");
    gramex(&dir)
        .args(["--config", "broken.toml", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config error"));
}

#[test]
fn parse_syntax_error_json() {
    let dir = workspace_with("p.pas", "program p;\nbegin x := ( 1 + end.");
    let out = gramex(&dir)
        .args(["--output", "json", "parse", "p.pas"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert!(value["syntax"]["index"].is_u64());
    assert!(value["syntax"]["message"].is_string());
}

// ──────────────────────────────────────────────
// 4. table and reduce
// ──────────────────────────────────────────────

#[test]
fn table_dumps_expression_relations() {
    let dir = TempDir::new().unwrap();
    gramex(&dir)
        .arg("table")
        .assert()
        .success()
        .stdout(predicate::str::contains("+ LOWER *\n"))
        .stdout(predicate::str::contains("* HIGHER +\n"))
        .stdout(predicate::str::contains("( EQUAL )\n"));
}

#[test]
fn table_json_has_every_terminal() {
    let dir = TempDir::new().unwrap();
    let out = gramex(&dir)
        .args(["--output", "json", "table"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["terminals"].as_array().unwrap().len(), 37);
    assert_eq!(value["conflicts"], serde_json::json!([]));
}

#[test]
fn table_rejects_grammar_with_selections() {
    let dir = TempDir::new().unwrap();
    gramex(&dir)
        .args(["table", "--grammar", "pascal"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("precedence table error"));
}

#[test]
fn reduce_prints_handles_in_order() {
    let dir = workspace_with("e.txt", "a + b * c");
    gramex(&dir)
        .args(["reduce", "e.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("35.2\n*\n+\n"))
        .stdout(predicate::str::contains("result: +"));
}

#[test]
fn reduce_json_has_postfix() {
    let dir = workspace_with("e.txt", "(a + b) * 2");
    let out = gramex(&dir)
        .args(["--output", "json", "reduce", "e.txt"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["postfix"], "35.0 35.1 + ( ) 36.2 *");
}

#[test]
fn reduce_adjacent_operands_exits_1() {
    let dir = workspace_with("e.txt", "a b");
    gramex(&dir)
        .args(["reduce", "e.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no precedence relation"));
}

// ──────────────────────────────────────────────
// 5. generate and check
// ──────────────────────────────────────────────

#[test]
fn generate_prints_pl1() {
    let dir = workspace_with("p.pas", "program p; var n : integer; begin n := 1 end.");
    gramex(&dir)
        .args(["generate", "p.pas"])
        .assert()
        .success()
        .stdout(
            "P: PROCEDURE OPTIONS (MAIN);\n    DECLARE N FIXED DECIMAL(32, 0);\n    N = 1;\nEND P;\n",
        );
}

#[test]
fn generate_reports_syntax_errors() {
    let dir = workspace_with("p.pas", "program p; begin n := end.");
    gramex(&dir)
        .args(["generate", "p.pas"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("syntax error"));
}

#[test]
fn check_every_builtin_grammar() {
    let dir = TempDir::new().unwrap();
    for name in ["pascal", "minimal", "expression"] {
        gramex(&dir)
            .args(["check", "--grammar", name])
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("grammar '{}' is valid", name)));
    }
}

#[test]
fn check_quiet_prints_nothing() {
    let dir = TempDir::new().unwrap();
    gramex(&dir)
        .args(["--quiet", "check"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
