use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::task::JoinSet;

use crate::cache::StalenessCache;
use crate::discover::discover_candidates;
use crate::parser;
use crate::search;
use crate::types::{
    CacheEntry, ContainerStats, ImportReport, Message, MessageCount, ScanStats, SearchMode,
    SearchResult, SessionFilter, SessionSummary, TopicCount,
};

/// Number of files whose extraction runs concurrently; the scan waits for a
/// whole batch before starting the next, bounding open handles and memory.
pub const SCAN_BATCH_SIZE: usize = 10;

/// A scan completed this recently short-circuits a rescan and returns the
/// current snapshot without touching disk.
pub const SCAN_FRESHNESS: Duration = Duration::from_secs(30);

/// The index of all discovered sessions.
///
/// Owns the summaries, the staleness cache, and the id-to-path side table.
/// Constructed explicitly and injected into whatever needs it; mutation
/// happens only in [`scan`](Self::scan), [`load`](Self::load), and
/// [`import_file`](Self::import_file).
pub struct SessionIndex {
    root: PathBuf,
    cache_path: PathBuf,
    cache: StalenessCache,
    summaries: Vec<SessionSummary>,
    paths_by_id: HashMap<String, PathBuf>,
    stats: ScanStats,
    last_scan: Option<Instant>,
    scanning: bool,
}

impl SessionIndex {
    /// Open an index over `root`, rebuilding in-memory state from the
    /// persisted cache so metadata queries are servable before the first
    /// scan completes.
    pub fn open(root: PathBuf, cache_path: PathBuf) -> Self {
        let cache = StalenessCache::load(&cache_path);

        // Oldest first, so the most recently observed path wins identity
        // collisions in both tables.
        let mut entries: Vec<&CacheEntry> = cache.entries().collect();
        entries.sort_by_key(|entry| entry.mtime_ms);

        let mut paths_by_id = HashMap::new();
        let mut by_id: BTreeMap<String, SessionSummary> = BTreeMap::new();
        for entry in entries {
            paths_by_id.insert(entry.id.clone(), entry.path.clone());
            by_id.insert(entry.id.clone(), entry.summary.clone());
        }
        let summaries = by_id.into_values().collect();

        Self {
            root,
            cache_path,
            cache,
            summaries,
            paths_by_id,
            stats: ScanStats::default(),
            last_scan: None,
            scanning: false,
        }
    }

    /// The resolved root this index scans.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Discover and index every session under the root.
    ///
    /// Exclusive: a scan observed while one runs, or within the freshness
    /// window of the last one, returns the current (possibly stale)
    /// snapshot instead of racing a second pass. Never fails; per-file
    /// problems are counted in [`ScanStats`] and logged.
    pub async fn scan(&mut self) -> Vec<SessionSummary> {
        if self.scanning {
            return self.snapshot();
        }
        if let Some(last) = self.last_scan {
            if last.elapsed() < SCAN_FRESHNESS {
                return self.snapshot();
            }
        }
        self.scanning = true;

        let mut stats = ScanStats::default();
        let candidates = discover_candidates(&self.root, &mut stats);
        let mut scanned: Vec<SessionSummary> = Vec::new();

        for batch in candidates.chunks(SCAN_BATCH_SIZE) {
            let mut jobs = Vec::new();
            for candidate in batch {
                let hit = self
                    .cache
                    .lookup(&candidate.path, candidate.size_bytes, candidate.mtime_ms)
                    .cloned();
                match hit {
                    Some(summary) => {
                        stats.cache_hits += 1;
                        self.paths_by_id
                            .insert(summary.id.clone(), candidate.path.clone());
                        scanned.push(summary);
                    }
                    None => jobs.push(candidate.clone()),
                }
            }

            let mut set = JoinSet::new();
            for candidate in jobs {
                set.spawn_blocking(move || {
                    let outcome = parser::extract_summary(&candidate);
                    (candidate, outcome)
                });
            }

            while let Some(joined) = set.join_next().await {
                let Ok((candidate, outcome)) = joined else {
                    stats.parse_errors += 1;
                    continue;
                };
                match outcome {
                    Ok(Some(summary)) => {
                        self.cache.store(CacheEntry {
                            path: candidate.path.clone(),
                            id: summary.id.clone(),
                            mtime_ms: candidate.mtime_ms,
                            size_bytes: candidate.size_bytes,
                            summary: summary.clone(),
                        });
                        self.paths_by_id.insert(summary.id.clone(), candidate.path);
                        scanned.push(summary);
                    }
                    Ok(None) => {
                        tracing::debug!(path = %candidate.path.display(), "not a session file");
                    }
                    Err(err) => {
                        stats.parse_errors += 1;
                        tracing::warn!(path = %candidate.path.display(), error = %err, "failed to extract session");
                    }
                }
            }
        }

        // Colliding identities across paths: the last observed one wins.
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut deduped: Vec<SessionSummary> = Vec::new();
        for summary in scanned {
            match positions.get(&summary.id) {
                Some(&pos) => deduped[pos] = summary,
                None => {
                    positions.insert(summary.id.clone(), deduped.len());
                    deduped.push(summary);
                }
            }
        }

        stats.sessions = deduped.len();
        self.summaries = deduped;
        self.stats = stats;

        if let Err(err) = self.cache.persist(&self.cache_path) {
            tracing::warn!(error = %err, "failed to persist cache snapshot");
        }

        tracing::info!(
            sessions = stats.sessions,
            containers = stats.containers,
            cache_hits = stats.cache_hits,
            parse_errors = stats.parse_errors,
            skipped_large = stats.skipped_large,
            "scan complete"
        );

        self.last_scan = Some(Instant::now());
        self.scanning = false;
        self.snapshot()
    }

    /// The current summaries, cloned.
    pub fn snapshot(&self) -> Vec<SessionSummary> {
        self.summaries.clone()
    }

    /// Look up one summary by identity.
    pub fn get(&self, id: &str) -> Option<&SessionSummary> {
        self.summaries.iter().find(|s| s.id == id)
    }

    /// The backing path for an identity, when one is known.
    pub fn path_of(&self, id: &str) -> Option<&Path> {
        self.paths_by_id.get(id).map(PathBuf::as_path)
    }

    /// List sessions matching the filter, most recently updated first.
    pub fn list(&self, filter: &SessionFilter) -> Vec<SessionSummary> {
        let mut matched: Vec<SessionSummary> = self
            .summaries
            .iter()
            .filter(|s| matches_filter(s, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        matched
    }

    /// The most recently updated sessions, at most `limit`.
    pub fn recent(&self, limit: usize) -> Vec<SessionSummary> {
        let mut recent = self.list(&SessionFilter::default());
        recent.truncate(limit);
        recent
    }

    /// Sessions grouped by container identity.
    pub fn grouped(&self) -> BTreeMap<String, Vec<SessionSummary>> {
        let mut groups: BTreeMap<String, Vec<SessionSummary>> = BTreeMap::new();
        for summary in &self.summaries {
            groups
                .entry(summary.container.clone())
                .or_default()
                .push(summary.clone());
        }
        groups
    }

    /// Per-container aggregates, largest first.
    pub fn container_stats(&self) -> Vec<ContainerStats> {
        let mut by_container: BTreeMap<String, ContainerStats> = BTreeMap::new();
        for summary in &self.summaries {
            let entry = by_container
                .entry(summary.container.clone())
                .or_insert_with(|| ContainerStats {
                    container: summary.container.clone(),
                    label: summary.container_label.clone(),
                    sessions: 0,
                    total_bytes: 0,
                });
            entry.sessions += 1;
            entry.total_bytes += summary.size_bytes;
        }
        let mut stats: Vec<ContainerStats> = by_container.into_values().collect();
        stats.sort_by(|a, b| b.sessions.cmp(&a.sessions));
        stats
    }

    /// Counters from the most recent scan.
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Materialize a session's full message list.
    ///
    /// With no known backing path, returns whatever messages the cached
    /// summary already carries. On success the stored summary's messages
    /// and count are overwritten (the count becomes exact). On error the
    /// previous summary is untouched and `None` is returned.
    pub fn load(&mut self, id: &str) -> Option<Vec<Message>> {
        let Some(path) = self.paths_by_id.get(id).cloned() else {
            return self.get(id).map(|s| s.messages.clone());
        };

        match parser::load_messages(&path, id) {
            Ok(messages) => {
                if let Some(summary) = self.summaries.iter_mut().find(|s| s.id == id) {
                    summary.message_count = MessageCount::Exact(messages.len());
                    summary.messages = messages.clone();
                    self.cache.update_summary(&path, summary.clone());
                }
                Some(messages)
            }
            Err(err) => {
                tracing::warn!(id, error = %err, "failed to load session content");
                None
            }
        }
    }

    /// Full-text multi-term search over the raw backing files, ranked by
    /// descending total match count. Unreadable files are skipped.
    pub fn deep_search(&self, terms: &[String], mode: SearchMode) -> Vec<SearchResult> {
        let mut results = Vec::new();
        for summary in &self.summaries {
            let Some(path) = self.paths_by_id.get(&summary.id) else {
                continue;
            };
            let Ok(text) = std::fs::read_to_string(path) else {
                continue;
            };
            if let Some((per_term, total)) = search::match_text(&text, terms, mode) {
                results.push(SearchResult {
                    id: summary.id.clone(),
                    per_term,
                    total,
                });
            }
        }
        results.sort_by(|a, b| b.total.cmp(&a.total));
        results
    }

    /// Aggregate topic ranking over a set of files (default: all indexed),
    /// summing each file's truncated top list before ranking.
    pub fn global_topics(&self, ids: Option<&[String]>, limit: usize) -> Vec<TopicCount> {
        let mut per_file = Vec::new();
        for summary in &self.summaries {
            if let Some(ids) = ids {
                if !ids.iter().any(|id| *id == summary.id) {
                    continue;
                }
            }
            let Some(path) = self.paths_by_id.get(&summary.id) else {
                continue;
            };
            let Ok(text) = std::fs::read_to_string(path) else {
                continue;
            };
            per_file.push(search::extract_topics(&text, search::PER_FILE_TOPICS));
        }
        search::aggregate_topics(per_file, limit)
    }

    /// Import sessions from a file, deduplicating on identity. Duplicates
    /// are skipped, per-entry failures accumulate, and only an unrecognized
    /// top-level shape fails the whole file.
    pub fn import_file(&mut self, path: &Path) -> ImportReport {
        let mut report = ImportReport::default();

        let (sessions, errors) = match crate::import::read_import_file(path) {
            Ok(parsed) => parsed,
            Err(err) => {
                report.errors.push(format!("{err:#}"));
                return report;
            }
        };
        report.errors = errors;

        for imported in sessions {
            if self.get(&imported.summary.id).is_some() {
                report.skipped += 1;
                continue;
            }
            if let Some(source) = imported.source {
                self.paths_by_id
                    .insert(imported.summary.id.clone(), source);
            }
            self.summaries.push(imported.summary);
            report.imported += 1;
        }

        report
    }

    /// Load full content for each id and return the summaries ready for
    /// export rendering. Unknown ids are silently dropped.
    pub fn sessions_for_export(&mut self, ids: &[String]) -> Vec<SessionSummary> {
        let mut sessions = Vec::new();
        for id in ids {
            self.load(id);
            if let Some(summary) = self.get(id) {
                sessions.push(summary.clone());
            }
        }
        sessions
    }
}

fn matches_filter(summary: &SessionSummary, filter: &SessionFilter) -> bool {
    if let Some(ref container) = filter.container {
        if summary.container != *container && summary.container_label != *container {
            return false;
        }
    }

    if let Some(after) = filter.after {
        if summary.updated_at < after {
            return false;
        }
    }

    if let Some(before) = filter.before {
        if summary.updated_at > before {
            return false;
        }
    }

    if let Some(ref search) = filter.search {
        let needle = search.to_lowercase();
        let haystack = format!(
            "{} {} {}",
            summary.first_preview, summary.last_preview, summary.container_label
        )
        .to_lowercase();
        if !haystack.contains(&needle) {
            return false;
        }
    }

    true
}
