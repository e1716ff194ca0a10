//! Presentation order for records.
//!
//! Browsing snapshots and search results share one stable order:
//! case-insensitive ascending by name, ties broken by the raw name so that
//! the order is total and re-sorting a merged list never shuffles entries.

use orrery_protocol::Record;
use std::cmp::Ordering;
use std::collections::HashSet;

pub fn compare_by_name(a: &Record, b: &Record) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}

/// Sort in place, A to Z.
pub fn sort_by_name(records: &mut [Record]) {
    records.sort_by(compare_by_name);
}

/// Append the records of `incoming` whose key is not in `target` yet, then
/// restore name order. Earlier occurrences win.
pub fn merge_by_name(target: &mut Vec<Record>, incoming: impl IntoIterator<Item = Record>) {
    let mut seen: HashSet<String> = target.iter().map(|r| r.key().to_string()).collect();
    target.extend(incoming.into_iter().filter(|r| seen.insert(r.key().to_string())));
    sort_by_name(target);
}
