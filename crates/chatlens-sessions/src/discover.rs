use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::types::{Candidate, ScanStats};

/// Files above this size are counted as skipped and never parsed. Bounds
/// worst-case memory and latency for the extraction step.
pub const MAX_SESSION_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// Nested directory inside each container that holds the session files.
pub const SESSIONS_DIR_NAME: &str = "chatSessions";

const SESSION_FILE_EXT: &str = "json";

/// Enumerate candidate session files under `root`.
///
/// Every immediate sub-directory is a container; containers without a
/// `chatSessions` directory are skipped. Candidates are stat'ed only.
/// A missing root yields an empty list, and a read error in one container
/// does not abort discovery of the others.
pub fn discover_candidates(root: &Path, stats: &mut ScanStats) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(_) => return candidates,
    };

    for entry in entries.flatten() {
        let container_dir = entry.path();
        if !container_dir.is_dir() {
            continue;
        }
        stats.containers += 1;

        let sessions_dir = container_dir.join(SESSIONS_DIR_NAME);
        if !sessions_dir.is_dir() {
            continue;
        }

        let container = entry.file_name().to_string_lossy().to_string();
        if let Err(err) = collect_container(&sessions_dir, &container, stats, &mut candidates) {
            stats.parse_errors += 1;
            tracing::warn!(container = %container, error = %err, "failed to read container");
        }
    }

    candidates
}

fn collect_container(
    sessions_dir: &Path,
    container: &str,
    stats: &mut ScanStats,
    out: &mut Vec<Candidate>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(sessions_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some(SESSION_FILE_EXT) {
            continue;
        }

        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        if meta.len() > MAX_SESSION_FILE_BYTES {
            stats.skipped_large += 1;
            tracing::debug!(path = %path.display(), size = meta.len(), "skipping oversize session file");
            continue;
        }

        out.push(Candidate {
            path,
            container: container.to_string(),
            size_bytes: meta.len(),
            mtime_ms: mtime_millis(&meta),
        });
    }
    Ok(())
}

/// Modification time as epoch milliseconds; 0 when the platform cannot
/// report one.
pub fn mtime_millis(meta: &std::fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
