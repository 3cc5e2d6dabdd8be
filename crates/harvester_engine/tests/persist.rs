use std::fs;

use harvester_core::{RecordCandidate, RecordStore};
use harvester_engine::{ensure_output_dir, text_projection, AtomicFileWriter, RecordFormat};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn sample_records() -> Vec<harvester_core::Record> {
    let mut store = RecordStore::new();
    store.merge(RecordCandidate::new("c1", "first line\nsecond line").with_author("@alice"));
    store.merge(RecordCandidate::new("c1.r1", "a reply").with_parent("c1"));
    store.finalize()
}

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn json_export_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("abc123.json", b"[]").unwrap();
    let second = writer
        .write_records("abc123", &sample_records(), RecordFormat::Json)
        .unwrap();
    assert_eq!(first, second);

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&second).unwrap()).unwrap();
    assert_eq!(
        written,
        serde_json::json!([
            { "id": "c1", "text": "first line\nsecond line", "author": "@alice" },
            { "id": "c1.r1", "parentId": "c1", "text": "a reply" }
        ])
    );
}

#[test]
fn text_export_is_one_line_per_record() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    let path = writer
        .write_records("watch?v=abc", &sample_records(), RecordFormat::Text)
        .unwrap();

    assert_eq!(path.file_name().unwrap(), "watch_v_abc.txt");
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "first line second line\na reply\n"
    );
    assert_eq!(text_projection(&[]), "");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write_records("abc", &sample_records(), RecordFormat::Json);
    assert!(result.is_err());
    assert!(!file_path.with_file_name("abc.json").exists());
}
