//! Shared types for the Orrery catalogue engine.
//!
//! Everything that crosses the boundary between the engine and a remote
//! listing API lives here: the [`Record`] model, [`Page`]s linked by opaque
//! [`Cursor`]s, the [`SourceError`] taxonomy, and the [`RemoteSource`]
//! contract the engine consumes.

pub mod decode;
pub mod error;
pub mod record;
pub mod source;

pub use decode::decode_page;
pub use error::SourceError;
pub use record::{Cursor, Page, Record};
pub use source::RemoteSource;
