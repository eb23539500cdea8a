use std::fs;
use std::path::PathBuf;

use serde_json::json;
use tempfile::TempDir;

use chatlens_sessions::{
    render_export, ExportFormat, MessageCount, Role, SessionIndex, EXPORT_FORMAT_TAG,
};

/// Helper: a root with two sessions ready to export.
fn create_export_root() -> TempDir {
    let dir = TempDir::new().unwrap();
    let sessions = dir.path().join("a1b2c3d4").join("chatSessions");
    fs::create_dir_all(&sessions).unwrap();

    for (id, question, answer) in [
        ("first-chat", "what is a borrow checker", "it enforces ownership at compile time"),
        ("second-chat", "why is my build slow", "too many codegen units"),
    ] {
        let content = json!({
            "sessionId": id,
            "creationDate": 1737370800000i64,
            "lastMessageDate": 1737374400000i64,
            "model": "sonnet",
            "requests": [
                {"message": {"text": question}, "response": {"result": {"value": answer}}},
            ],
        });
        fs::write(sessions.join(format!("{id}.json")), content.to_string()).unwrap();
    }

    dir
}

async fn scanned_index(root: &TempDir, state: &TempDir) -> SessionIndex {
    let mut index = SessionIndex::open(
        root.path().to_path_buf(),
        state.path().join("cache.json"),
    );
    index.scan().await;
    index
}

fn empty_index(state: &TempDir) -> SessionIndex {
    SessionIndex::open(
        state.path().join("no-storage"),
        state.path().join("cache.json"),
    )
}

// ============================================================
// Export rendering
// ============================================================

#[tokio::test]
async fn json_export_carries_the_envelope_and_messages() {
    let root = create_export_root();
    let state = TempDir::new().unwrap();
    let mut index = scanned_index(&root, &state).await;

    let ids = vec!["first-chat".to_string()];
    let sessions = index.sessions_for_export(&ids);
    let payload = render_export(&sessions, ExportFormat::Json);

    let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(value["format"], EXPORT_FORMAT_TAG);
    assert_eq!(value["version"], 1);
    assert_eq!(value["chats"].as_array().unwrap().len(), 1);
    assert_eq!(value["chats"][0]["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn markdown_export_has_a_section_per_session_and_message() {
    let root = create_export_root();
    let state = TempDir::new().unwrap();
    let mut index = scanned_index(&root, &state).await;

    let ids = vec!["first-chat".to_string(), "second-chat".to_string()];
    let sessions = index.sessions_for_export(&ids);
    let payload = render_export(&sessions, ExportFormat::Markdown);

    assert_eq!(payload.matches("# Workspace a1b2c3d4").count(), 2);
    assert!(payload.contains("## User"));
    assert!(payload.contains("## Assistant"));
    assert!(payload.contains("what is a borrow checker"));
}

#[tokio::test]
async fn html_export_escapes_content() {
    let root = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let sessions_dir = root.path().join("a1b2c3d4").join("chatSessions");
    fs::create_dir_all(&sessions_dir).unwrap();
    let content = json!({
        "sessionId": "spicy",
        "creationDate": 1737370800000i64,
        "lastMessageDate": 1737370800000i64,
        "requests": [
            {"message": {"text": "render <b>bold</b> & stuff"}, "response": "use &amp; entities"},
        ],
    });
    fs::write(sessions_dir.join("spicy.json"), content.to_string()).unwrap();

    let mut index = scanned_index(&root, &state).await;
    let ids = vec!["spicy".to_string()];
    let sessions = index.sessions_for_export(&ids);
    let payload = render_export(&sessions, ExportFormat::Html);

    assert!(payload.contains("render &lt;b&gt;bold&lt;/b&gt; &amp; stuff"));
    assert!(!payload.contains("<b>bold</b>"));
}

#[tokio::test]
async fn original_export_is_a_byte_copy() {
    let root = create_export_root();
    let state = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let index = scanned_index(&root, &state).await;

    let source = index.path_of("first-chat").unwrap().to_path_buf();
    let dest = out.path().join("copy.json");
    chatlens_sessions::copy_original(&source, &dest).unwrap();

    assert_eq!(fs::read(&source).unwrap(), fs::read(&dest).unwrap());
}

// ============================================================
// Import: round trip and dedup
// ============================================================

#[tokio::test]
async fn export_import_round_trip_preserves_counts_and_order() {
    let root = create_export_root();
    let state = TempDir::new().unwrap();
    let mut index = scanned_index(&root, &state).await;

    let ids = vec!["first-chat".to_string(), "second-chat".to_string()];
    let sessions = index.sessions_for_export(&ids);
    let payload = render_export(&sessions, ExportFormat::Json);

    let out = TempDir::new().unwrap();
    let export_path = out.path().join("export.json");
    fs::write(&export_path, payload).unwrap();

    let target_state = TempDir::new().unwrap();
    let mut target = empty_index(&target_state);
    let report = target.import_file(&export_path);

    assert!(report.ok());
    assert_eq!(report.imported, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(target.snapshot().len(), 2);

    for id in ["first-chat", "second-chat"] {
        let original = index.get(id).unwrap();
        let imported = target.get(id).unwrap();
        assert_eq!(imported.message_count, original.message_count);
        assert_eq!(imported.messages, original.messages);
    }
}

#[tokio::test]
async fn importing_the_same_payload_twice_skips_every_entry() {
    let root = create_export_root();
    let state = TempDir::new().unwrap();
    let mut index = scanned_index(&root, &state).await;

    let ids = vec!["first-chat".to_string(), "second-chat".to_string()];
    let sessions = index.sessions_for_export(&ids);
    let out = TempDir::new().unwrap();
    let export_path = out.path().join("export.json");
    fs::write(&export_path, render_export(&sessions, ExportFormat::Json)).unwrap();

    let target_state = TempDir::new().unwrap();
    let mut target = empty_index(&target_state);
    target.import_file(&export_path);
    let before = target.snapshot();

    let report = target.import_file(&export_path);
    assert_eq!(report.imported, 0);
    assert_eq!(report.skipped, 2);
    assert!(report.ok());
    assert_eq!(target.snapshot(), before);
}

// ============================================================
// Import: other shapes
// ============================================================

#[tokio::test]
async fn single_entry_payload_imports_and_dedups() {
    let state = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let mut index = empty_index(&state);

    let payload = json!({
        "id": "handwritten",
        "messages": [
            {"role": "user", "content": "ping", "timestamp": 1737370800000i64},
            {"role": "assistant", "content": "pong", "timestamp": 1737370860000i64},
        ],
    });
    let path = out.path().join("single.json");
    fs::write(&path, payload.to_string()).unwrap();

    let report = index.import_file(&path);
    assert_eq!(report.imported, 1);
    assert!(report.ok());

    let session = index.get("handwritten").unwrap();
    assert_eq!(session.message_count, MessageCount::Exact(2));
    assert_eq!(session.messages[0].role, Role::User);
    assert_eq!(session.messages[1].content, "pong");
    assert_eq!(session.first_preview, "ping");

    let report = index.import_file(&path);
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn native_session_file_imports_with_grandparent_label() {
    let state = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let mut index = empty_index(&state);

    let sessions_dir = out.path().join("my-project").join("chatSessions");
    fs::create_dir_all(&sessions_dir).unwrap();
    let content = json!({
        "sessionId": "native-import",
        "creationDate": 1737370800000i64,
        "lastMessageDate": 1737374400000i64,
        "model": "sonnet",
        "requests": [
            {"message": {"text": "hello there"}, "response": "general kenobi"},
        ],
    });
    let path = sessions_dir.join("native-import.json");
    fs::write(&path, content.to_string()).unwrap();

    let report = index.import_file(&path);
    assert_eq!(report.imported, 1);
    assert!(report.ok());

    let session = index.get("native-import").unwrap();
    assert_eq!(session.container_label, "my-project");
    assert_eq!(session.message_count, MessageCount::Exact(2));
    // The backing file is known, so a lazy load works afterwards.
    assert_eq!(index.path_of("native-import"), Some(path.as_path()));
}

#[tokio::test]
async fn unrecognized_shape_reports_observed_fields() {
    let state = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let mut index = empty_index(&state);

    let path = out.path().join("mystery.json");
    fs::write(&path, json!({"foo": 1, "bar": [2]}).to_string()).unwrap();

    let report = index.import_file(&path);
    assert_eq!(report.imported, 0);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("foo"));
    assert!(report.errors[0].contains("bar"));
}

#[tokio::test]
async fn partial_success_accumulates_errors() {
    let state = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let mut index = empty_index(&state);

    let payload = json!({
        "chats": [
            {"id": "good-one", "messages": [{"role": "user", "content": "works"}]},
            {"surprise": true},
        ],
    });
    let path = out.path().join("mixed.json");
    fs::write(&path, payload.to_string()).unwrap();

    let report = index.import_file(&path);
    assert_eq!(report.imported, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("chat entry 1"));
    assert!(index.get("good-one").is_some());
}

#[tokio::test]
async fn imported_payload_entries_vanish_on_the_next_scan() {
    let root = create_export_root();
    let state = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let payload = json!({
        "id": "transient",
        "messages": [{"role": "user", "content": "here for now"}],
    });
    let path = out.path().join("single.json");
    fs::write(&path, payload.to_string()).unwrap();

    let mut index = scanned_index(&root, &state).await;
    index.import_file(&path);
    assert!(index.get("transient").is_some());

    // Summaries are replaced wholesale by the next scan pass; entries with
    // no backing file under the root do not survive it.
    let fresh_state = TempDir::new().unwrap();
    let mut index = SessionIndex::open(
        root.path().to_path_buf(),
        fresh_state.path().join("cache.json"),
    );
    index.import_file(&path);
    index.scan().await;
    assert!(index.get("transient").is_none());
}

#[test]
fn copy_original_fails_cleanly_on_missing_source() {
    let out = TempDir::new().unwrap();
    let missing = PathBuf::from("/definitely/not/here.json");
    let err = chatlens_sessions::copy_original(&missing, &out.path().join("x.json"));
    assert!(err.is_err());
}
