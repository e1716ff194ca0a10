//! Orrery Test Utilities
//!
//! A scriptable [`RemoteSource`](orrery_protocol::RemoteSource) and record
//! fixtures, so engine tests never touch the network.
//!
//! # Usage
//!
//! ```rust,ignore
//! use orrery_test_utils::{alphabet_records, ScriptedSource};
//!
//! let source = ScriptedSource::new();
//! source.set_first_page(Page::new(Some("page-2".into()), alphabet_records(10)));
//! source.set_page("page-2", Page::last(alphabet_records(12)[10..].to_vec()));
//! ```

pub mod fixtures;
pub mod scripted;

pub use fixtures::{alphabet_records, names, planet, record};
pub use scripted::{ScriptedSource, SourceCall};
