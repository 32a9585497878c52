use serde::Serialize;
use std::collections::HashMap;

/// A grouping key and its summed count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedEntry {
    pub key: String,
    pub count: u64,
}

impl AggregatedEntry {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// Group `(key, count)` pairs by key, summing counts, ordered by descending
/// count.
///
/// Keys with equal counts keep the order in which they were first seen.
pub fn aggregate<K, I>(pairs: I) -> Vec<AggregatedEntry>
where
    K: Into<String> + AsRef<str>,
    I: IntoIterator<Item = (K, u64)>,
{
    let mut entries: Vec<AggregatedEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (key, count) in pairs {
        if let Some(&slot) = index.get(key.as_ref()) {
            entries[slot].count = entries[slot].count.saturating_add(count);
        } else {
            let key: String = key.into();
            index.insert(key.clone(), entries.len());
            entries.push(AggregatedEntry { key, count });
        }
    }

    // `sort_by` is stable, so ties stay in first-seen order.
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

/// Sum of all counts in `entries`.
pub fn total(entries: &[AggregatedEntry]) -> u64 {
    entries
        .iter()
        .fold(0u64, |acc, entry| acc.saturating_add(entry.count))
}
