#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use serde_json::{json, Value};
use tempfile::tempdir;

fn invoicing(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("invoicing").expect("binary built");
    cmd.arg("--data-dir").arg(data_dir).env("INVOICING_LOG", "off");
    cmd
}

fn company_request() -> String {
    json!({
        "op": "createCompany",
        "args": {
            "name": "Acme",
            "gstin": "29ABCDE1234F1Z5",
            "address_line1": "1 Main St",
            "city": "Pune",
            "state": "MH"
        }
    })
    .to_string()
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is one JSON document")
}

#[test]
fn call_prints_envelope_and_persists() {
    let dir = tempdir().unwrap();

    let output = invoicing(dir.path())
        .args(["call", &company_request()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let envelope = stdout_json(&output);
    assert_eq!(envelope["ok"], true);
    assert_eq!(envelope["result"], 1);
    assert!(dir.path().join("invoices.db").exists());

    let output = invoicing(dir.path())
        .args(["call", r#"{"op":"getCompanies"}"#])
        .output()
        .unwrap();
    let envelope = stdout_json(&output);
    assert_eq!(envelope["result"][0]["name"], "Acme");
}

#[test]
fn call_with_failing_request_exits_one() {
    let dir = tempdir().unwrap();
    let output = invoicing(dir.path())
        .args(["call", r#"{"op":"deleteInvoice","args":{"id":0}}"#])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let envelope = stdout_json(&output);
    assert_eq!(envelope["ok"], false);
    assert_eq!(envelope["error"]["code"], "VALIDATION/INVALID_FIELD");
}

#[test]
fn serve_answers_each_line_and_survives_garbage() {
    let dir = tempdir().unwrap();
    let input = format!(
        "{}\nnot json at all\n\n{}\n",
        json!({"id": "a", "op": "createCompany", "args": {
            "name": "Acme", "gstin": "G", "addressLine1": "1 Main St", "city": "Pune", "state": "MH"
        }}),
        json!({"id": "b", "op": "getInvoiceDetails", "args": {"id": 9}}),
    );

    let output = invoicing(dir.path())
        .arg("serve")
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let replies: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(replies.len(), 3);

    let by_id = |id: &str| {
        replies
            .iter()
            .find(|reply| reply["id"] == id)
            .cloned()
            .unwrap_or_else(|| panic!("no reply for {id}"))
    };
    assert_eq!(by_id("a")["ok"], true);
    assert_eq!(by_id("b")["error"]["code"], "NOT_FOUND/INVOICE");

    let garbage = replies
        .iter()
        .find(|reply| reply.get("id").is_none())
        .unwrap();
    assert_eq!(garbage["ok"], false);
    assert_eq!(garbage["error"]["code"], "JSON/SYNTAX");
}

#[test]
fn serve_is_the_default_and_exits_on_eof() {
    let dir = tempdir().unwrap();
    let output = invoicing(dir.path()).write_stdin("").output().unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn db_status_reports_counts() {
    let dir = tempdir().unwrap();
    invoicing(dir.path())
        .args(["call", &company_request()])
        .assert()
        .success();

    let output = invoicing(dir.path())
        .args(["db", "status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let status = stdout_json(&output);
    assert_eq!(status["stats"]["companies"], 1);
    assert_eq!(status["stats"]["invoices"], 0);
    assert_eq!(status["pragmas"]["foreign_keys"], 1);
    assert_eq!(status["pragmas"]["journal_mode"], "wal");
    assert_eq!(
        status["tables"],
        json!(["companies", "invoice_items", "invoices"])
    );

    let output = invoicing(dir.path())
        .args(["db", "status"])
        .output()
        .unwrap();
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("companies"));
    assert!(text.contains("journal_mode=wal"));
}
