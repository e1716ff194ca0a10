//! Record, page and cursor types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A planet as delivered by the listing API.
///
/// Strings are kept exactly as the server sent them; formatting belongs to
/// the presentation layer. Identity is the natural key (`name`): two records
/// with the same name are the same record, whatever their other fields say.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub climate: String,
    pub gravity: String,
    pub terrain: String,
    pub diameter: String,
    pub population: String,
}

impl Record {
    /// Record with only a name set. Handy for fixtures and tests.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            climate: String::new(),
            gravity: String::new(),
            terrain: String::new(),
            diameter: String::new(),
            population: String::new(),
        }
    }

    /// The dedupe key.
    pub fn key(&self) -> &str {
        &self.name
    }

    pub fn with_climate(mut self, climate: impl Into<String>) -> Self {
        self.climate = climate.into();
        self
    }

    pub fn with_terrain(mut self, terrain: impl Into<String>) -> Self {
        self.terrain = terrain.into();
        self
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Opaque continuation token ("fetch more after this point").
///
/// The listing API hands out absolute URLs; nothing in the engine looks
/// inside. Not stable across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One page of results. `cursor == None` means this was the last page known
/// to that fetch path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub cursor: Option<Cursor>,
    pub records: Vec<Record>,
}

impl Page {
    pub fn new(cursor: Option<Cursor>, records: Vec<Record>) -> Self {
        Self { cursor, records }
    }

    /// A page with no continuation.
    pub fn last(records: Vec<Record>) -> Self {
        Self::new(None, records)
    }
}
