//! Search backends.
//!
//! [`SearchEngine`] runs one already-debounced query against either the
//! remote search endpoint or a filtered snapshot of the local index. Debounce,
//! cancellation and stale-result handling live in the session actor.

pub mod filter;

use crate::backfill::BackfillWalker;
use crate::index::LocalIndex;
use crate::sorting::merge_by_name;
use orrery_protocol::{Record, RemoteSource, SourceError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub use filter::{filter_records, fold};

/// Where queries are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    /// The remote search endpoint.
    #[default]
    Remote,
    /// Substring filter over the local index.
    Local,
}

impl fmt::Display for SearchBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchBackend::Remote => write!(f, "remote"),
            SearchBackend::Local => write!(f, "local"),
        }
    }
}

impl FromStr for SearchBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(SearchBackend::Remote),
            "local" => Ok(SearchBackend::Local),
            other => Err(format!("unknown search backend '{}'", other)),
        }
    }
}

/// Answers queries. Cheap to clone; clones share the injected failure slot.
pub struct SearchEngine<S> {
    backend: SearchBackend,
    source: Arc<S>,
    index: LocalIndex,
    backfill: Arc<BackfillWalker<S>>,
    next_failure: Arc<Mutex<Option<SourceError>>>,
}

impl<S> Clone for SearchEngine<S> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend,
            source: Arc::clone(&self.source),
            index: self.index.clone(),
            backfill: Arc::clone(&self.backfill),
            next_failure: Arc::clone(&self.next_failure),
        }
    }
}

impl<S: RemoteSource> SearchEngine<S> {
    pub fn new(
        backend: SearchBackend,
        source: Arc<S>,
        index: LocalIndex,
        backfill: Arc<BackfillWalker<S>>,
    ) -> Self {
        Self {
            backend,
            source,
            index,
            backfill,
            next_failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Make the next local query fail with `error`. Consumed by one query.
    pub fn fail_next_search(&self, error: SourceError) {
        if let Ok(mut slot) = self.next_failure.lock() {
            *slot = Some(error);
        }
    }

    /// Run `query` (trimmed). Results are deduped by key and sorted by name.
    ///
    /// The returned future owns everything it needs so it can be spawned and
    /// aborted independently of the engine.
    pub fn run(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<Record>, SourceError>> + Send + 'static {
        let engine = self.clone();
        let query = query.trim().to_string();
        async move {
            let found = match engine.backend {
                SearchBackend::Remote => engine.source.search(&query).await?.records,
                SearchBackend::Local => engine.run_local(&query)?,
            };
            let mut results = Vec::with_capacity(found.len());
            merge_by_name(&mut results, found);
            debug!(query = %query, backend = %engine.backend, hits = results.len(), "Search complete");
            Ok(results)
        }
    }

    fn run_local(&self, query: &str) -> Result<Vec<Record>, SourceError> {
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }
        // Widen the index for later queries; this one sees the current snapshot.
        self.backfill.trigger();
        Ok(filter_records(&self.index.snapshot(), query))
    }

    fn take_injected_failure(&self) -> Option<SourceError> {
        self.next_failure.lock().ok().and_then(|mut slot| slot.take())
    }
}
