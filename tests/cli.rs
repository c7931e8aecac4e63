use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::TempDir;

fn workdir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    for name in ["corpus-dump.xml", "stopwords.txt", "raw_topic.txt"] {
        fs::copy(fixtures.join(name), dir.path().join(name)).unwrap();
    }
    dir
}

fn topicscope(dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_topicscope"));
    command
        .arg("--workdir")
        .arg(dir)
        .env("TOPICSCOPE_DIMENSIONS", "16")
        .env("RUST_LOG", "warn");
    command
}

fn success_json(output: Output) -> Value {
    assert!(
        output.status.success(),
        "cli exited with {}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("cli prints JSON")
}

#[test]
fn train_writes_both_artifacts() {
    let dir = workdir();
    let output = topicscope(dir.path()).arg("train").output().expect("run CLI");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("vocabulary.dict").is_file());
    assert!(dir.path().join("embeddings.model").is_file());
}

#[test]
fn query_terms_prints_topics_and_keywords() {
    let dir = workdir();
    let output = topicscope(dir.path())
        .args(["query", "--terms", "Networking,loop", "--term-top-n", "0"])
        .output()
        .expect("run CLI");

    let json = success_json(output);
    assert_eq!(json["keywords"], serde_json::json!(["networking", "loop"]));
    assert_eq!(
        json["topics"],
        serde_json::json!(["computer networking basics", "while loops", "for loops"])
    );
}

#[test]
fn query_reads_text_from_stdin() {
    let dir = workdir();
    let mut child = topicscope(dir.path())
        .args(["query", "--out-top-n", "1", "--term-top-n", "0"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn CLI");
    child
        .stdin
        .as_mut()
        .expect("stdin open")
        .write_all(b"Classes and the object model")
        .expect("write stdin");

    let json = success_json(child.wait_with_output().expect("read CLI output"));
    assert_eq!(json["topics"], serde_json::json!(["classes and objects"]));
    assert_eq!(json["keywords"][0], "classes");
}

#[test]
fn tokenize_applies_stopwords_and_filtering() {
    let dir = workdir();
    let output = topicscope(dir.path())
        .args(["tokenize", "The for-loop: i++ (of 10)"])
        .output()
        .expect("run CLI");
    assert_eq!(
        success_json(output),
        serde_json::json!(["forloop", "i++"])
    );
}

#[test]
fn missing_topic_list_fails_with_context() {
    let dir = workdir();
    fs::remove_file(dir.path().join("raw_topic.txt")).unwrap();
    let output = topicscope(dir.path())
        .args(["query", "--terms", "loop"])
        .output()
        .expect("run CLI");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load topics"), "{stderr}");
}
