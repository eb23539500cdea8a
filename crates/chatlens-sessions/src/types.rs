use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One chat message, in the order it appears in the source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Message count carried by a summary.
///
/// Metadata extraction estimates turns x 2 without reading responses; a full
/// load replaces the estimate with the real count. The two variants are
/// deliberately distinct and must not be collapsed into a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count", rename_all = "snake_case")]
pub enum MessageCount {
    Estimated(usize),
    Exact(usize),
}

impl MessageCount {
    pub fn value(self) -> usize {
        match self {
            MessageCount::Estimated(n) | MessageCount::Exact(n) => n,
        }
    }

    pub fn is_exact(self) -> bool {
        matches!(self, MessageCount::Exact(_))
    }
}

/// Lightweight description of one session, used for listing and browsing.
///
/// `messages` stays empty until a full load or an import attaches content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub container: String,
    pub container_label: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub first_preview: String,
    pub last_preview: String,
    pub message_count: MessageCount,
    pub size_bytes: u64,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

/// One persisted cache record.
///
/// Valid for reuse only while both `mtime_ms` and `size_bytes` still match
/// the live file; either mismatch forces re-extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub id: String,
    pub mtime_ms: i64,
    pub size_bytes: u64,
    pub summary: SessionSummary,
}

/// A discovered candidate file. Stat only, no content read yet.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    pub container: String,
    pub size_bytes: u64,
    pub mtime_ms: i64,
}

/// Counters for one scan pass. Recomputed fresh each scan, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub containers: usize,
    pub sessions: usize,
    pub parse_errors: usize,
    pub skipped_large: usize,
    pub cache_hits: usize,
}

/// Filter parameters for listing sessions.
#[derive(Debug, Default)]
pub struct SessionFilter {
    pub search: Option<String>,
    pub container: Option<String>,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
}

/// Per-container aggregate, sorted by session count for display.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerStats {
    pub container: String,
    pub label: String,
    pub sessions: usize,
    pub total_bytes: u64,
}

/// How deep search combines its terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Any term occurring at least once includes the file.
    Any,
    /// Every term must occur at least once.
    All,
    /// The terms joined into a single phrase must occur verbatim.
    Exact,
}

/// One deep-search hit, with per-term occurrence counts.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub per_term: Vec<(String, usize)>,
    pub total: usize,
}

/// A ranked vocabulary token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCount {
    pub word: String,
    pub count: usize,
}

/// Target format for a rendered export payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
    Html,
}

/// Outcome of one import run. Partial success is normal: some entries
/// imported, others skipped as duplicates or failed, reported together.
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl ImportReport {
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}
