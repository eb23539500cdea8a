use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use thiserror::Error;

use crate::discover::mtime_millis;
use crate::parser;
use crate::types::{Candidate, Message, MessageCount, Role, SessionSummary};

/// The one hard import failure: a file whose top-level shape matches
/// nothing we know how to read. Carries the observed field names for
/// diagnostics.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unrecognized import format (top-level fields: {fields})")]
    UnrecognizedFormat { fields: String },
}

/// One session recovered from an import file. `source` is set only when a
/// real session file backs the entry.
#[derive(Debug)]
pub struct ImportedSession {
    pub summary: SessionSummary,
    pub source: Option<PathBuf>,
}

/// Read an import file and convert it into session summaries.
///
/// Shape detection, in priority order: a payload carrying a `chats` array;
/// a single-entry payload with an identity and a messages array; a native
/// session file. Per-entry failures accumulate as strings so partial
/// success is possible; only an unrecognized top-level shape is a hard
/// failure.
pub fn read_import_file(path: &Path) -> Result<(Vec<ImportedSession>, Vec<String>)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read import file {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse import file {}", path.display()))?;

    if value.get("chats").is_some_and(Value::is_array) {
        return Ok(import_chats_payload(&value));
    }

    if has_identity(&value) && value.get("messages").is_some_and(Value::is_array) {
        let session = import_entry(&value).map_err(|err| err.context("single-entry payload"))?;
        return Ok((vec![session], Vec::new()));
    }

    if value.get("sessionId").is_some() && value.get("requests").is_some_and(Value::is_array) {
        let session = import_native_file(path)?;
        return Ok((vec![session], Vec::new()));
    }

    let fields = match value.as_object() {
        Some(obj) => obj.keys().cloned().collect::<Vec<_>>().join(", "),
        None => "(not an object)".to_string(),
    };
    Err(ImportError::UnrecognizedFormat { fields }.into())
}

fn import_chats_payload(value: &Value) -> (Vec<ImportedSession>, Vec<String>) {
    let mut sessions = Vec::new();
    let mut errors = Vec::new();

    let entries = value
        .get("chats")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for (index, entry) in entries.iter().enumerate() {
        match import_entry(entry) {
            Ok(session) => sessions.push(session),
            Err(err) => errors.push(format!("chat entry {index}: {err:#}")),
        }
    }

    (sessions, errors)
}

/// One payload entry: either our own export shape (a serialized summary) or
/// a looser identity-plus-messages object from another exporter.
fn import_entry(value: &Value) -> Result<ImportedSession> {
    if let Ok(summary) = serde_json::from_value::<SessionSummary>(value.clone()) {
        return Ok(ImportedSession {
            summary,
            source: None,
        });
    }

    let id = identity_of(value)
        .ok_or_else(|| anyhow::anyhow!("entry has no identity field"))?
        .to_string();
    let raw_messages = value
        .get("messages")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("entry has no messages array"))?;

    let messages: Vec<Message> = raw_messages
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| lenient_message(raw, &id, index))
        .collect();

    let now = Utc::now();
    let created_at = messages.first().map(|m| m.timestamp).unwrap_or(now);
    let updated_at = messages.last().map(|m| m.timestamp).unwrap_or(created_at);
    let first_user = messages.iter().find(|m| m.role == Role::User);
    let last_user = messages.iter().rev().find(|m| m.role == Role::User);

    let summary = SessionSummary {
        id,
        container: string_field(value, "container").unwrap_or_else(|| "imported".to_string()),
        container_label: string_field(value, "container_label")
            .unwrap_or_else(|| "Imported".to_string()),
        created_at,
        updated_at,
        first_preview: first_user.map(|m| m.content.clone()).unwrap_or_default(),
        last_preview: last_user.map(|m| m.content.clone()).unwrap_or_default(),
        message_count: MessageCount::Exact(messages.len()),
        size_bytes: 0,
        tags: vec!["Unknown".to_string()],
        attachment: None,
        messages,
    };

    Ok(ImportedSession {
        summary,
        source: None,
    })
}

/// Convert a native session file through the same parsing used for lazy
/// loads. The container label comes from the sibling descriptor when one
/// exists, else from the file's grandparent directory name.
fn import_native_file(path: &Path) -> Result<ImportedSession> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("failed to stat import file {}", path.display()))?;

    let container = path
        .parent()
        .and_then(Path::parent)
        .and_then(Path::file_name)
        .and_then(|s| s.to_str())
        .unwrap_or("imported")
        .to_string();

    let candidate = Candidate {
        path: path.to_path_buf(),
        container: container.clone(),
        size_bytes: meta.len(),
        mtime_ms: mtime_millis(&meta),
    };

    let mut summary = parser::extract_summary(&candidate)?
        .ok_or_else(|| anyhow::anyhow!("session file has no request entries"))?;
    summary.container_label = parser::descriptor_label(path).unwrap_or(container);

    let messages = parser::load_messages(path, &summary.id)?;
    summary.message_count = MessageCount::Exact(messages.len());
    summary.messages = messages;

    Ok(ImportedSession {
        summary,
        source: Some(path.to_path_buf()),
    })
}

fn lenient_message(value: &Value, session_id: &str, index: usize) -> Option<Message> {
    let content = value
        .get("content")
        .or_else(|| value.get("text"))
        .and_then(Value::as_str)?
        .to_string();

    let role = match value.get("role").and_then(Value::as_str) {
        Some("assistant") => Role::Assistant,
        _ => Role::User,
    };

    let timestamp = parser::parse_timestamp(value.get("timestamp")).unwrap_or_else(Utc::now);
    let id = string_field(value, "id").unwrap_or_else(|| format!("{session_id}:{index}"));

    Some(Message {
        id,
        role,
        content,
        timestamp,
    })
}

fn has_identity(value: &Value) -> bool {
    identity_of(value).is_some()
}

fn identity_of(value: &Value) -> Option<&str> {
    value
        .get("id")
        .or_else(|| value.get("sessionId"))
        .and_then(Value::as_str)
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}
