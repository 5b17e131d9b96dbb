//! Relevance filter over raw similarity-search results.

use std::cmp::Ordering;
use std::collections::HashMap;
use supportline_core::retrieval::RetrievedSnippet;

/// Snippets usable as context for one turn.
///
/// `has_context` is false exactly when `snippets` is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelevantContext {
    pub snippets: Vec<RetrievedSnippet>,
    pub has_context: bool,
}

impl RelevantContext {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Threshold, dedupe, re-rank, and cap retrieval output.
///
/// Upstream ordering is not trusted. Snippets scoring below `threshold`
/// (or NaN) are dropped, duplicates of the same source position keep their
/// best score, and the rest are sorted by score descending with ties broken
/// by source id then position ascending.
pub fn filter_relevant(
    snippets: Vec<RetrievedSnippet>,
    threshold: f32,
    top_k: usize,
) -> RelevantContext {
    let mut best: HashMap<(String, usize), RetrievedSnippet> = HashMap::new();
    for snippet in snippets {
        if snippet.score.is_nan() || snippet.score < threshold {
            continue;
        }
        let key = (snippet.source_id.clone(), snippet.position_index);
        match best.get(&key) {
            Some(existing) if existing.score >= snippet.score => {}
            _ => {
                best.insert(key, snippet);
            }
        }
    }

    let mut kept: Vec<RetrievedSnippet> = best.into_values().collect();
    kept.sort_by(rank);
    kept.truncate(top_k);

    RelevantContext {
        has_context: !kept.is_empty(),
        snippets: kept,
    }
}

fn rank(a: &RetrievedSnippet, b: &RetrievedSnippet) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.source_id.cmp(&b.source_id))
        .then_with(|| a.position_index.cmp(&b.position_index))
}
