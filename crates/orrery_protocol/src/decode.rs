//! Response payload decoding.
//!
//! The listing API has been observed returning three different payload
//! shapes for the same endpoint. Candidates are attempted in a fixed
//! priority order and [`SourceError::DecodeFailure`] is reported only when
//! none of them match:
//!
//! 1. Paged envelope: `{ "count": .., "next": "<url>" | null, "results": [..] }`
//! 2. Bare array of records (no continuation)
//! 3. A single record object (wrapped as a one-record page)

use crate::error::SourceError;
use crate::record::{Cursor, Page, Record};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PagedEnvelope {
    #[serde(default)]
    next: Option<String>,
    results: Vec<RecordDto>,
}

#[derive(Debug, Deserialize)]
struct RecordDto {
    name: String,
    climate: String,
    gravity: String,
    terrain: String,
    diameter: String,
    population: String,
}

impl From<RecordDto> for Record {
    fn from(dto: RecordDto) -> Self {
        Record {
            name: dto.name,
            climate: dto.climate,
            gravity: dto.gravity,
            terrain: dto.terrain,
            diameter: dto.diameter,
            population: dto.population,
        }
    }
}

fn into_records(dtos: Vec<RecordDto>) -> Vec<Record> {
    dtos.into_iter().map(Record::from).collect()
}

/// Decode a raw response body into a [`Page`].
pub fn decode_page(bytes: &[u8]) -> Result<Page, SourceError> {
    if let Ok(envelope) = serde_json::from_slice::<PagedEnvelope>(bytes) {
        let cursor = envelope
            .next
            .filter(|next| !next.trim().is_empty())
            .map(Cursor::new);
        return Ok(Page::new(cursor, into_records(envelope.results)));
    }

    if let Ok(list) = serde_json::from_slice::<Vec<RecordDto>>(bytes) {
        return Ok(Page::last(into_records(list)));
    }

    match serde_json::from_slice::<RecordDto>(bytes) {
        Ok(single) => Ok(Page::last(vec![single.into()])),
        Err(err) => Err(SourceError::decode(format!(
            "payload matched no known shape ({} bytes): {}",
            bytes.len(),
            err
        ))),
    }
}
