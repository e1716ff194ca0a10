//! The remote listing contract consumed by the engine.

use crate::error::SourceError;
use crate::record::{Cursor, Page};
use std::future::Future;

/// A paginated remote listing.
///
/// Implementations must not be assumed to return disjoint records across
/// calls: duplicates across pages are expected and the engine tolerates them.
/// All three operations may fail with a classified [`SourceError`].
pub trait RemoteSource: Send + Sync + 'static {
    /// Fetch the first page of the collection.
    fn fetch_first(&self) -> impl Future<Output = Result<Page, SourceError>> + Send;

    /// Fetch the page a previous response pointed at.
    fn fetch_at(&self, cursor: &Cursor) -> impl Future<Output = Result<Page, SourceError>> + Send;

    /// Server-side search. Results are a single page; any cursor is ignored.
    fn search(&self, query: &str) -> impl Future<Output = Result<Page, SourceError>> + Send;
}
