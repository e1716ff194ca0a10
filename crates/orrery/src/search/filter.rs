//! Local substring filter over an index snapshot.

use orrery_protocol::Record;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold text for matching: canonical decomposition, combining marks dropped,
/// lowercased. "Túndra" and "tundra" fold to the same string.
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Case- and diacritic-insensitive substring match across name, climate and
/// terrain. An empty (post-trim) query returns everything.
pub fn filter_records(records: &[Record], query: &str) -> Vec<Record> {
    let needle = fold(query.trim());
    if needle.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|record| matches(record, &needle))
        .cloned()
        .collect()
}

fn matches(record: &Record, folded_needle: &str) -> bool {
    [&record.name, &record.climate, &record.terrain]
        .iter()
        .any(|field| fold(field).contains(folded_needle))
}
