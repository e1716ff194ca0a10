//! Session-scoped local index of every record seen so far.
//!
//! # Design
//!
//! A single actor task exclusively owns the index state (records in
//! insertion order plus the set of seen keys). Writers send `Ingest`
//! commands over a channel and the actor applies them one at a time, so two
//! ingests never interleave their insert loops and insertion order stays
//! stable.
//!
//! Readers never talk to the actor. After each ingest the actor publishes an
//! immutable [`IndexView`] through a `watch` channel; [`LocalIndex::snapshot`]
//! just clones the latest published `Arc`. A snapshot therefore sees either
//! all or none of one ingest's insertions, and reading never queues behind
//! writers.
//!
//! The index only grows. Nothing is evicted and nothing is persisted.

use orrery_protocol::{Cursor, Page, Record};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

/// Index errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// The index actor has stopped (runtime shutting down).
    #[error("Local index is closed")]
    Closed,
}

/// Outcome of one ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    /// Records whose key was new.
    pub inserted: usize,
    /// Records skipped because the key was already present.
    pub duplicates: usize,
    /// Index size after the ingest.
    pub total: usize,
}

/// Immutable point-in-time view published after every ingest.
#[derive(Debug, Clone)]
pub struct IndexView {
    pub records: Arc<[Record]>,
    /// Continuation reported by the most recently ingested page.
    pub next_cursor: Option<Cursor>,
}

impl Default for IndexView {
    fn default() -> Self {
        Self {
            records: Arc::from(Vec::new()),
            next_cursor: None,
        }
    }
}

enum IndexCommand {
    Ingest {
        page: Page,
        respond: oneshot::Sender<IngestReport>,
    },
}

/// Owned index state. Only the actor touches it.
#[derive(Debug, Default)]
struct IndexState {
    records: Vec<Record>,
    seen_keys: HashSet<String>,
    next_cursor: Option<Cursor>,
}

impl IndexState {
    /// Dedupe-and-append every record of `page`, then adopt its cursor.
    fn apply(&mut self, page: Page) -> IngestReport {
        let mut report = IngestReport::default();
        for record in page.records {
            if self.seen_keys.insert(record.key().to_string()) {
                self.records.push(record);
                report.inserted += 1;
            } else {
                report.duplicates += 1;
            }
        }
        self.next_cursor = page.cursor;
        report.total = self.records.len();
        debug_assert_eq!(self.records.len(), self.seen_keys.len());
        report
    }
}

/// Handle to the local index. Cheap to clone; all clones share one actor.
#[derive(Debug, Clone)]
pub struct LocalIndex {
    cmd_tx: mpsc::UnboundedSender<IndexCommand>,
    view: watch::Receiver<IndexView>,
}

impl std::fmt::Debug for IndexCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexCommand::Ingest { page, .. } => f
                .debug_struct("Ingest")
                .field("records", &page.records.len())
                .field("cursor", &page.cursor)
                .finish(),
        }
    }
}

impl LocalIndex {
    /// Start an empty index on the current tokio runtime.
    ///
    /// The actor stops once every handle has been dropped.
    pub fn spawn() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(IndexView::default());
        tokio::spawn(run_actor(cmd_rx, view_tx));
        Self {
            cmd_tx,
            view: view_rx,
        }
    }

    /// Ingest a page and wait until it is visible to snapshots.
    ///
    /// Idempotent: re-ingesting a page never changes the records. The
    /// page's cursor replaces the stored continuation.
    pub async fn ingest(&self, page: Page) -> Result<IngestReport, IndexError> {
        let (respond, response) = oneshot::channel();
        self.cmd_tx
            .send(IndexCommand::Ingest { page, respond })
            .map_err(|_| IndexError::Closed)?;
        response.await.map_err(|_| IndexError::Closed)
    }

    /// Records as of the last completed ingest, in insertion order.
    pub fn snapshot(&self) -> Arc<[Record]> {
        Arc::clone(&self.view.borrow().records)
    }

    /// Continuation from the most recently ingested page.
    pub fn next_cursor(&self) -> Option<Cursor> {
        self.view.borrow().next_cursor.clone()
    }

    pub fn len(&self) -> usize {
        self.view.borrow().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver that is notified after every ingest.
    pub fn subscribe(&self) -> watch::Receiver<IndexView> {
        self.view.clone()
    }
}

async fn run_actor(
    mut commands: mpsc::UnboundedReceiver<IndexCommand>,
    view: watch::Sender<IndexView>,
) {
    info!("Local index started");
    let mut state = IndexState::default();
    let mut published: Arc<[Record]> = Arc::from(Vec::new());

    while let Some(command) = commands.recv().await {
        match command {
            IndexCommand::Ingest { page, respond } => {
                let report = state.apply(page);
                if report.inserted > 0 {
                    published = Arc::from(state.records.as_slice());
                }
                view.send_replace(IndexView {
                    records: Arc::clone(&published),
                    next_cursor: state.next_cursor.clone(),
                });
                debug!(
                    inserted = report.inserted,
                    duplicates = report.duplicates,
                    total = report.total,
                    "Ingested page"
                );
                let _ = respond.send(report);
            }
        }
    }

    info!(records = state.records.len(), "Local index stopped");
}
