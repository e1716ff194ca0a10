//! Background cursor walk that fills the local index.
//!
//! At most one walk is active per walker. Triggering while a walk is in
//! flight is a no-op, enforced by a compare-and-swap on an `AtomicBool`.
//! The flag is cleared by a guard owned by the walk task, so it resets on
//! exhaustion, on the first failed fetch, and when the task is aborted.

use crate::cancel::{CancellationToken, TaskBag};
use crate::index::LocalIndex;
use orrery_protocol::{Cursor, RemoteSource, SourceError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result of a trigger request.
#[derive(Debug)]
pub enum BackfillTrigger {
    /// Backfill is switched off by configuration or the walker was shut down.
    Disabled,
    /// A walk is already in flight; nothing new was started.
    AlreadyRunning,
    /// The index holds no continuation cursor.
    NothingToFetch,
    /// A new walk was spawned.
    Started(JoinHandle<BackfillOutcome>),
}

/// Why a walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackfillStop {
    /// The source stopped returning a cursor.
    Exhausted,
    /// A fetch failed. The walk is not retried automatically.
    Failed(SourceError),
    /// Shutdown was requested or the index went away.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillOutcome {
    /// Pages fetched and ingested by this walk.
    pub pages: usize,
    pub stop: BackfillStop,
}

/// Clears the in-flight flag when the walk ends, however it ends.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Follows the index's continuation cursor until the source runs dry.
pub struct BackfillWalker<S> {
    source: Arc<S>,
    index: LocalIndex,
    enabled: bool,
    in_flight: Arc<AtomicBool>,
    cancel: CancellationToken,
    tasks: TaskBag,
}

impl<S: RemoteSource> BackfillWalker<S> {
    pub fn new(source: Arc<S>, index: LocalIndex, enabled: bool) -> Self {
        Self {
            source,
            index,
            enabled,
            in_flight: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            tasks: TaskBag::new(),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start a walk from the index's current cursor unless one is running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger(&self) -> BackfillTrigger {
        if !self.enabled || self.cancel.is_cancelled() {
            debug!("Backfill trigger ignored: disabled");
            return BackfillTrigger::Disabled;
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Backfill trigger ignored: walk already in flight");
            return BackfillTrigger::AlreadyRunning;
        }
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        let Some(cursor) = self.index.next_cursor() else {
            debug!("Backfill trigger ignored: no cursor");
            return BackfillTrigger::NothingToFetch;
        };

        info!(cursor = %cursor, "Backfill started");
        let handle = tokio::spawn(walk(
            Arc::clone(&self.source),
            self.index.clone(),
            cursor,
            self.cancel.clone(),
            guard,
        ));
        self.tasks.insert(handle.abort_handle());
        BackfillTrigger::Started(handle)
    }

    /// Stop the current walk and refuse further triggers.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.tasks.cancel_all();
    }
}

async fn walk<S: RemoteSource>(
    source: Arc<S>,
    index: LocalIndex,
    mut cursor: Cursor,
    cancel: CancellationToken,
    _guard: InFlightGuard,
) -> BackfillOutcome {
    let mut pages = 0;
    let stop = loop {
        if cancel.is_cancelled() {
            break BackfillStop::Cancelled;
        }

        let page = match source.fetch_at(&cursor).await {
            Ok(page) => page,
            Err(err) => {
                warn!(cursor = %cursor, error = %err, "Backfill stopped on fetch error");
                break BackfillStop::Failed(err);
            }
        };

        let next = page.cursor.clone();
        match index.ingest(page).await {
            Ok(report) => {
                pages += 1;
                debug!(
                    page = pages,
                    inserted = report.inserted,
                    total = report.total,
                    "Backfill page ingested"
                );
            }
            Err(err) => {
                warn!(error = %err, "Backfill stopped: index unavailable");
                break BackfillStop::Cancelled;
            }
        }

        match next {
            Some(next) => cursor = next,
            None => break BackfillStop::Exhausted,
        }
    };

    info!(pages, stop = ?stop, "Backfill finished");
    BackfillOutcome { pages, stop }
}
