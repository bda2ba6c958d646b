mod common;

use std::process::Command;
use tempfile::TempDir;

fn archgraph() -> Command {
    // `cargo test` sets this for integration tests.
    Command::new(env!("CARGO_BIN_EXE_archgraph"))
}

#[test]
fn cli_prints_the_report() {
    let tmp = TempDir::new().unwrap();
    common::polyglot_fixture(tmp.path());

    let out = archgraph().arg(tmp.path()).arg("--pretty").output().expect("run archgraph");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("stdout is JSON");
    assert!(v["graph"]["entities"].as_array().unwrap().len() >= 8);
    assert_eq!(v["backends"].as_array().unwrap().len(), 3);
    assert!(v["fingerprint"].as_str().unwrap().len() == 16);

    let ctrl = v["graph"]["entities"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["identifier"] == "com.acme.users.UserController")
        .unwrap();
    assert_eq!(ctrl["role"], "CONTROLLER");
    assert_eq!(ctrl["isEntryPoint"], true);
}

#[test]
fn cli_graph_only_and_skip() {
    let tmp = TempDir::new().unwrap();
    common::polyglot_fixture(tmp.path());

    let out = archgraph()
        .arg(tmp.path())
        .args(["--graph-only", "--skip", "go", "--skip", "script"])
        .output()
        .expect("run archgraph");
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(v.get("backends").is_none());
    let entities = v["entities"].as_array().unwrap();
    assert_eq!(entities.len(), 3);
    assert!(entities.iter().all(|e| e["language"] == "java"));
    assert!(v["entryPoints"].is_array());
}

#[test]
fn cli_fails_on_missing_root() {
    let tmp = TempDir::new().unwrap();
    let out = archgraph().arg(tmp.path().join("absent")).output().expect("run archgraph");
    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Project root not found"));
}

#[test]
fn cli_rejects_unknown_backend() {
    let tmp = TempDir::new().unwrap();
    let out = archgraph()
        .arg(tmp.path())
        .args(["--skip", "cobol"])
        .output()
        .expect("run archgraph");
    assert!(!out.status.success());
}

#[test]
fn cli_fails_when_every_backend_fails() {
    let tmp = TempDir::new().unwrap();
    common::write(tmp.path(), "go.mod", "module example.com/x\n");
    common::write(
        tmp.path(),
        "strict.json",
        r#"{ "go": { "command": "sh", "args": ["-c", "exit 2"], "append_root": false } }"#,
    );

    let out = archgraph()
        .arg(tmp.path())
        .arg("--config")
        .arg(tmp.path().join("strict.json"))
        .output()
        .expect("run archgraph");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Every active backend failed"));
}
