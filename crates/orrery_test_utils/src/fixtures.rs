//! Record fixtures.

use orrery_protocol::Record;

/// A record with only a name.
pub fn record(name: &str) -> Record {
    Record::named(name)
}

/// A fully populated record.
pub fn planet(name: &str, climate: &str, terrain: &str) -> Record {
    Record {
        name: name.to_string(),
        climate: climate.to_string(),
        gravity: "1 standard".to_string(),
        terrain: terrain.to_string(),
        diameter: "10000".to_string(),
        population: "unknown".to_string(),
    }
}

/// Records named A, B, C... (wrapping after Z).
pub fn alphabet_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|index| {
            let letter = char::from(b'A' + (index % 26) as u8);
            Record::named(letter.to_string())
        })
        .collect()
}

/// Names of the given records, in order.
pub fn names(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.name.clone()).collect()
}
