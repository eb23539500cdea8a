use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::types::{Candidate, Message, MessageCount, Role, SessionSummary};

/// Prefix read size for metadata extraction. Covers typical small sessions
/// in one read; larger files fall back to a full read.
pub const SUMMARY_READ_BYTES: u64 = 256 * 1024;

/// Previews keep this many characters of the first and last user turns.
pub const PREVIEW_CHARS: usize = 200;

/// Sibling descriptor file that labels a container.
pub const CONTAINER_DESCRIPTOR: &str = "workspace.json";

/// On-disk shape of a native session file. Timestamp and response fields
/// vary across producers, so those stay as raw values and are probed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSession {
    session_id: Option<String>,
    creation_date: Option<Value>,
    last_message_date: Option<Value>,
    model: Option<String>,
    attachment: Option<String>,
    #[serde(default)]
    requests: Vec<RawRequest>,
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    message: Option<RawMessage>,
    response: Option<Value>,
    timestamp: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContainerDescriptor {
    folder: Option<String>,
}

/// Produce a summary for a candidate file without materializing message
/// content.
///
/// Reads a fixed-size prefix first and parses it as a complete document;
/// when that fails and the file is larger than the prefix, retries with a
/// full read (explicit two-step attempt, not a retry loop). A document
/// without request entries is not a session and yields `Ok(None)`.
pub fn extract_summary(candidate: &Candidate) -> Result<Option<SessionSummary>> {
    let raw = read_session(&candidate.path, candidate.size_bytes)?;

    if raw.requests.is_empty() {
        return Ok(None);
    }

    let id = raw
        .session_id
        .clone()
        .unwrap_or_else(|| file_stem(&candidate.path));

    let now = Utc::now();
    let created_at = parse_timestamp(raw.creation_date.as_ref()).unwrap_or(now);
    let updated_at = parse_timestamp(raw.last_message_date.as_ref()).unwrap_or(now);

    let user_turns: Vec<&str> = raw
        .requests
        .iter()
        .filter_map(|r| r.message.as_ref().and_then(|m| m.text.as_deref()))
        .collect();
    let first_preview = user_turns.first().map(|t| preview(t)).unwrap_or_default();
    let last_preview = user_turns.last().map(|t| preview(t)).unwrap_or_default();

    Ok(Some(SessionSummary {
        id,
        container: candidate.container.clone(),
        container_label: resolve_container_label(&candidate.path, &candidate.container),
        created_at,
        updated_at,
        first_preview,
        last_preview,
        // One user plus one assistant message per turn; the full loader
        // replaces this with the real count.
        message_count: MessageCount::Estimated(raw.requests.len() * 2),
        size_bytes: candidate.size_bytes,
        tags: vec![raw.model.unwrap_or_else(|| "Unknown".to_string())],
        attachment: raw.attachment,
        messages: Vec::new(),
    }))
}

/// Fully parse a session file into its ordered message list.
///
/// Each request entry contributes a user message when its text field is
/// present, then an assistant message when any recognized response shape
/// carries text. A turn with no recognizable response contributes the user
/// message only.
pub fn load_messages(path: &Path, session_id: &str) -> Result<Vec<Message>> {
    let content = std::fs::read(path)
        .with_context(|| format!("failed to read session file {}", path.display()))?;
    let raw: RawSession = serde_json::from_slice(&content)
        .with_context(|| format!("failed to parse session file {}", path.display()))?;

    let session_created = parse_timestamp(raw.creation_date.as_ref());
    let mut messages = Vec::new();

    for (turn, request) in raw.requests.iter().enumerate() {
        let timestamp = parse_timestamp(request.timestamp.as_ref())
            .or(session_created)
            .unwrap_or_else(Utc::now);

        if let Some(text) = request.message.as_ref().and_then(|m| m.text.as_ref()) {
            messages.push(Message {
                id: format!("{session_id}:{turn}:user"),
                role: Role::User,
                content: text.clone(),
                timestamp,
            });
        }

        if let Some(text) = request.response.as_ref().and_then(probe_response) {
            messages.push(Message {
                id: format!("{session_id}:{turn}:assistant"),
                role: Role::Assistant,
                content: text,
                timestamp,
            });
        }
    }

    Ok(messages)
}

/// Probe the known response shapes in priority order; the first one that
/// yields non-empty text wins.
fn probe_response(response: &Value) -> Option<String> {
    if let Some(text) = response.as_str() {
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }

    for pointer in ["/result/value", "/result/response"] {
        if let Some(text) = response.pointer(pointer).and_then(Value::as_str) {
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }

    if let Some(parts) = response.as_array() {
        let joined = parts
            .iter()
            .filter_map(|part| {
                part.as_str()
                    .or_else(|| part.get("value").and_then(Value::as_str))
            })
            .collect::<Vec<_>>()
            .join("\n");
        if !joined.is_empty() {
            return Some(joined);
        }
    }

    None
}

/// Label a container from its sibling descriptor file, or synthesize a
/// placeholder from the container identity.
pub fn resolve_container_label(session_path: &Path, container: &str) -> String {
    descriptor_label(session_path).unwrap_or_else(|| {
        let prefix: String = container.chars().take(8).collect();
        format!("Workspace {prefix}")
    })
}

/// Label from the `workspace.json` descriptor two levels above a session
/// file, when one exists and names a folder.
pub(crate) fn descriptor_label(session_path: &Path) -> Option<String> {
    let descriptor = session_path
        .parent()
        .and_then(Path::parent)
        .map(|dir| dir.join(CONTAINER_DESCRIPTOR))?;

    let content = std::fs::read_to_string(descriptor).ok()?;
    let parsed: ContainerDescriptor = serde_json::from_str(&content).ok()?;
    parsed
        .folder
        .as_deref()
        .and_then(folder_basename)
        .map(str::to_string)
}

/// Timestamps appear as epoch milliseconds or RFC 3339 strings depending on
/// the producer version.
pub fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Number(n) => {
            let millis = n.as_i64()?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

fn read_session(path: &Path, size_bytes: u64) -> Result<RawSession> {
    let mut file = std::fs::File::open(path)
        .with_context(|| format!("failed to open session file {}", path.display()))?;

    let prefix_len = size_bytes.min(SUMMARY_READ_BYTES) as usize;
    let mut buf = vec![0u8; prefix_len];
    file.read_exact(&mut buf)
        .with_context(|| format!("failed to read session file {}", path.display()))?;

    match serde_json::from_slice::<RawSession>(&buf) {
        Ok(raw) => Ok(raw),
        Err(partial_err) => {
            if size_bytes <= SUMMARY_READ_BYTES {
                return Err(partial_err)
                    .with_context(|| format!("failed to parse session file {}", path.display()));
            }
            // The prefix cut the document mid-structure; read the rest.
            let mut rest = Vec::new();
            file.read_to_end(&mut rest)
                .with_context(|| format!("failed to read session file {}", path.display()))?;
            buf.extend_from_slice(&rest);
            serde_json::from_slice(&buf)
                .with_context(|| format!("failed to parse session file {}", path.display()))
        }
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{truncated}...")
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn folder_basename(folder: &str) -> Option<&str> {
    folder
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn probe_prefers_direct_string() {
        let value = json!("direct answer");
        assert_eq!(probe_response(&value).as_deref(), Some("direct answer"));
    }

    #[test]
    fn probe_reads_nested_result_value() {
        let value = json!({"result": {"value": "nested answer"}});
        assert_eq!(probe_response(&value).as_deref(), Some("nested answer"));
    }

    #[test]
    fn probe_reads_alternate_result_field() {
        let value = json!({"result": {"response": "alternate answer"}});
        assert_eq!(probe_response(&value).as_deref(), Some("alternate answer"));
    }

    #[test]
    fn probe_joins_content_parts() {
        let value = json!([{"value": "part one"}, {"value": "part two"}]);
        assert_eq!(
            probe_response(&value).as_deref(),
            Some("part one\npart two")
        );
    }

    #[test]
    fn probe_rejects_unknown_shapes() {
        assert_eq!(probe_response(&json!({"other": true})), None);
        assert_eq!(probe_response(&json!(42)), None);
        assert_eq!(probe_response(&json!("")), None);
    }

    #[test]
    fn timestamps_accept_millis_and_rfc3339() {
        let from_millis = parse_timestamp(Some(&json!(1700000000000i64))).unwrap();
        assert_eq!(from_millis.timestamp_millis(), 1700000000000);

        let from_string = parse_timestamp(Some(&json!("2026-03-01T12:00:00Z"))).unwrap();
        assert_eq!(from_string.to_rfc3339(), "2026-03-01T12:00:00+00:00");

        assert!(parse_timestamp(Some(&json!(["no"]))).is_none());
        assert!(parse_timestamp(None).is_none());
    }

    #[test]
    fn preview_truncates_with_ellipsis() {
        let long = "x".repeat(300);
        let cut = preview(&long);
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }
}
