//! Occurrence tables and first-fit top-K selection

use serde::Serialize;
use std::collections::BTreeMap;

/// Number of ranked entries kept per table in a report
pub const DEFAULT_TOP_K: usize = 3;

/// One ranked `(key, count)` pair of a top-K list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RankedEntry {
    pub key: String,
    pub count: u64,
}

impl RankedEntry {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// Per-window count of each observed category value
///
/// Keys iterate in sorted order, so anything computed from a finished table
/// depends only on its final counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccurrenceTable {
    counts: BTreeMap<String, u64>,
}

impl OccurrenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: &str) {
        match self.counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(key.to_string(), 1);
            }
        }
    }

    pub fn count(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(key, count)| (key.as_str(), *count))
    }

    pub fn top_k(&self, k: usize) -> Vec<RankedEntry> {
        select_top_k(self.iter(), k)
    }
}

/// First-fit top-K over `(key, count)` candidates
///
/// The working set holds at most `k` entries. The first `k` candidates are
/// taken as-is; after that a candidate evicts the first working entry whose
/// count is strictly lower, scanning in working-set order. This is not
/// min-eviction: when counts tie near the boundary the result may differ
/// from the exact top-K. Output is sorted by count (descending), then key.
pub fn select_top_k<'a, I>(candidates: I, k: usize) -> Vec<RankedEntry>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut working: Vec<RankedEntry> = Vec::with_capacity(k);
    if k == 0 {
        return working;
    }

    for (key, count) in candidates {
        if working.len() < k {
            working.push(RankedEntry::new(key, count));
            continue;
        }
        if let Some(victim) = working.iter().position(|entry| entry.count < count) {
            working.remove(victim);
            working.push(RankedEntry::new(key, count));
        }
    }

    working.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    working
}
