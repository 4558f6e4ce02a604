use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;

fn fixture(name: &str) -> PathBuf
{
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../symtree-core/tests/fixtures")
        .join(name)
}

fn symtree(args: &[&str]) -> Output
{
    Command::new(env!("CARGO_BIN_EXE_symtree"))
        .args(args)
        .env("RUST_LOG", "warn")
        .env_remove("SYMTREE_LOG_FILE")
        .output()
        .expect("failed to run symtree")
}

fn stdout(output: &Output) -> String
{
    assert!(
        output.status.success(),
        "symtree failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn test_images_lists_every_diagnostic()
{
    let path = fixture("xcode_simulated.json");
    let out = stdout(&symtree(&["images", path.to_str().unwrap()]));

    assert!(out.contains("crash #0  iPhone OS 14.0.1 (18A393)  [load-address]"));
    assert!(out.contains("hang #1"));
    assert!(out.contains("cpu-exception #2"));
    assert!(out.contains("disk-write-exception #3"));
    assert!(out.contains("0x000000000000007b - 0x0000000000012345  CDB53DDB-2337-4933-B62F-4356E6174AF0  testBinaryName"));
}

#[test]
fn test_images_forced_offset_addressing()
{
    let path = fixture("xcode_simulated.json");
    let out = stdout(&symtree(&["images", path.to_str().unwrap(), "--addressing", "offset"]));

    assert!(out.contains("[offset]"));
    assert!(out.contains("0x00000000000122ca - 0x0000000000012345"));
}

#[test]
fn test_images_json()
{
    let path = fixture("xcode_simulated.json");
    let out = stdout(&symtree(&["images", path.to_str().unwrap(), "--json"]));
    let listing: Value = serde_json::from_str(&out).unwrap();

    let diagnostics = listing.as_array().unwrap();
    assert_eq!(diagnostics.len(), 4);
    assert_eq!(diagnostics[0]["kind"], "crash");
    assert_eq!(diagnostics[0]["addressing"], "load-address");
    assert_eq!(diagnostics[0]["binaryImages"][0]["loadAddress"], 123);
    assert_eq!(diagnostics[0]["binaryImages"][0]["uuid"], "CDB53DDB-2337-4933-B62F-4356E6174AF0");
}

#[test]
fn test_legacy_through_override()
{
    let path = fixture("xcode_simulated.json");
    let out = stdout(&symtree(&["images", path.to_str().unwrap(), "--legacy-through", "ios=13.7"]));

    assert!(out.contains("crash #0  iPhone OS 14.0.1 (18A393)  [offset]"));
}

#[test]
fn test_symbolicate_to_stdout()
{
    let path = fixture("xcode_simulated.json");
    let out = stdout(&symtree(&["symbolicate", path.to_str().unwrap()]));
    let payload: Value = serde_json::from_str(out.trim()).unwrap();

    assert_eq!(payload["timeStampBegin"], "2020-10-10 19:35:24 +0000");
    let frame = &payload["crashDiagnostics"][0]["callStackTree"]["callStacks"][0]["callStackRootFrames"][0];
    assert_eq!(frame["address"], 74565);
    // No images registered: the frame was looked up and nothing matched.
    assert_eq!(frame["symbolInfo"], Value::Array(Vec::new()));
}

#[test]
fn test_symbolicate_to_out_dir()
{
    let dir = tempfile::tempdir().unwrap();
    let first = fixture("xcode_simulated.json");
    let second = fixture("nested_report.json");

    let output = symtree(&[
        "symbolicate",
        first.to_str().unwrap(),
        second.to_str().unwrap(),
        "--pretty",
        "--out-dir",
        dir.path().to_str().unwrap(),
    ]);
    assert!(stdout(&output).is_empty());

    let written = fs::read_to_string(dir.path().join("xcode_simulated.symbolicated.json")).unwrap();
    assert!(written.contains('\n'));
    let payload: Value = serde_json::from_str(&written).unwrap();
    assert!(payload["hangDiagnostics"].is_array());

    let nested = fs::read(dir.path().join("nested_report.symbolicated.json")).unwrap();
    let payload: Value = serde_json::from_slice(&nested).unwrap();
    assert_eq!(payload["crashDiagnostics"][0]["diagnosticMetaData"]["osVersion"], "iPhone OS 16.1 (20B82)");
}

#[test]
fn test_trace_lists_frames()
{
    let path = fixture("nested_report.json");
    let out = stdout(&symtree(&["trace", path.to_str().unwrap()]));

    assert!(out.starts_with("crash #0  iPhone OS 16.1 (20B82)  [offset]"));
    assert!(out.contains("Call stack 0"));
    assert!(out.contains("Call stack 1"));
}

#[test]
fn test_missing_payload_fails()
{
    let output = symtree(&["images", "/definitely/not/here.json"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error: "));
}

#[test]
fn test_malformed_payload_fails()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, b"{\"timeStampBegin\": 42}").unwrap();

    let output = symtree(&["symbolicate", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to decode diagnostic JSON"));
}

#[test]
fn test_non_object_binary_fails()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not-a-binary");
    fs::write(&path, b"plain text").unwrap();
    let payload = fixture("xcode_simulated.json");

    let output = symtree(&["symbolicate", payload.to_str().unwrap(), "--binary", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to parse image"));
}

#[test]
fn test_invalid_binary_id_is_a_usage_error()
{
    let payload = fixture("xcode_simulated.json");
    let output = symtree(&["symbolicate", payload.to_str().unwrap(), "--binary-id", "nope"]);
    assert_eq!(output.status.code(), Some(2));
}
