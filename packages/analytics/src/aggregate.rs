//! Counting helpers with explicit, deterministic tie-breaks.

use std::collections::BTreeMap;

use traffic_map_analytics_models::CategoryCount;

/// Counts occurrences of each label, most frequent first. Labels with
/// equal counts are ordered alphabetically.
#[must_use]
pub fn value_counts<I, S>(labels: I) -> Vec<CategoryCount>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for label in labels {
        *counts.entry(label.as_ref().to_string()).or_default() += 1;
    }

    let mut result: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(label, count)| CategoryCount { label, count })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count));
    result
}

/// Counts occurrences of each key and returns them in key order.
#[must_use]
pub fn counts_by_key<K: Ord>(keys: impl IntoIterator<Item = K>) -> BTreeMap<K, u64> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    counts
}

/// The most frequent value. Ties go to the smallest value: the lowest code
/// for coded enums, the alphabetically first string for labels.
#[must_use]
pub fn mode<T: Ord>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut best: Option<(T, u64)> = None;
    for (value, count) in counts_by_key(values) {
        if best.as_ref().is_none_or(|(_, best_count)| count > *best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

/// `part` as a percentage of `total`; zero when `total` is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
