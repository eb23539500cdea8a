use std::collections::HashMap;

use crate::stopwords::is_stop_word;
use crate::types::{SearchMode, TopicCount};

/// Per-file topic list length used when aggregating across files.
pub const PER_FILE_TOPICS: usize = 50;

/// Count the terms of one file's raw text under the given mode.
///
/// Returns the per-term counts and total when the file qualifies for
/// inclusion, `None` otherwise. In `Exact` mode the terms are joined into a
/// single phrase and counted as one unit.
pub fn match_text(
    text: &str,
    terms: &[String],
    mode: SearchMode,
) -> Option<(Vec<(String, usize)>, usize)> {
    let haystack = text.to_lowercase();

    if mode == SearchMode::Exact {
        let phrase = terms.join(" ").to_lowercase();
        if phrase.is_empty() {
            return None;
        }
        let count = count_occurrences(&haystack, &phrase);
        if count == 0 {
            return None;
        }
        return Some((vec![(terms.join(" "), count)], count));
    }

    let per_term: Vec<(String, usize)> = terms
        .iter()
        .map(|term| {
            let count = count_occurrences(&haystack, &term.to_lowercase());
            (term.clone(), count)
        })
        .collect();
    let total: usize = per_term.iter().map(|(_, count)| count).sum();

    let included = match mode {
        SearchMode::Any => total > 0,
        SearchMode::All => !per_term.is_empty() && per_term.iter().all(|(_, count)| *count > 0),
        SearchMode::Exact => unreachable!(),
    };

    included.then_some((per_term, total))
}

/// Non-overlapping occurrence count. Caller lower-cases both sides.
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        count += 1;
        start += pos + needle.len();
    }
    count
}

/// Frequency-ranked vocabulary of a text, stop words and identifier-shaped
/// tokens removed.
pub fn extract_topics(text: &str, limit: usize) -> Vec<TopicCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for token in tokenize(text) {
        let word = token.to_lowercase();
        if is_stop_word(&word) || looks_like_identifier(&word) {
            continue;
        }
        *counts.entry(word).or_insert(0) += 1;
    }

    rank(counts, limit)
}

/// Sum per-file topic lists into one ranking. Each input list is already
/// truncated to its file's top tokens, so the aggregate is an approximation
/// of the corpus-wide tally, trading exactness for bounded per-file cost.
pub fn aggregate_topics(per_file: Vec<Vec<TopicCount>>, limit: usize) -> Vec<TopicCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for topics in per_file {
        for topic in topics {
            *counts.entry(topic.word).or_insert(0) += topic.count;
        }
    }
    rank(counts, limit)
}

fn rank(counts: HashMap<String, usize>, limit: usize) -> Vec<TopicCount> {
    let mut ranked: Vec<TopicCount> = counts
        .into_iter()
        .map(|(word, count)| TopicCount { word, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

/// Word tokens: runs of letters, digits, and underscores, at least four
/// characters, starting with a letter.
fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|token| token.chars().count() >= 4)
        .filter(|token| token.chars().next().is_some_and(|c| c.is_ascii_alphabetic()))
}

/// Identifier-shaped tokens carry no topical signal: trailing digits after
/// letters, a leading digit, or an embedded underscore.
fn looks_like_identifier(word: &str) -> bool {
    word.contains('_')
        || word.chars().next().is_some_and(|c| c.is_ascii_digit())
        || word.chars().last().is_some_and(|c| c.is_ascii_digit())
}
