//! Session orchestrator.
//!
//! # Design
//!
//! The session is an actor. [`SessionHandle`] sends [`Command`]s over an
//! unbounded channel; a single task owns the browsing snapshot, the pager,
//! the mode and every in-flight operation. Network calls run in spawned
//! tasks that post their outcome back to the actor, so the actor never
//! awaits the source and state changes are applied one command at a time.
//!
//! After each command the actor publishes a [`ViewState`] through a `watch`
//! channel. Front ends read it synchronously or wait for changes.
//!
//! Search input is debounced with a generation counter: each edit bumps the
//! counter and (re)starts a sleeper task, and a due search whose generation
//! is no longer current is dropped. Issued searches carry their own
//! generation so a result that lost the race to a newer query is discarded.

mod command;
pub mod state;

pub use state::{Mode, PageDirection, TotalPages, ViewState};

use crate::backfill::BackfillWalker;
use crate::cancel::TaskBag;
use crate::config::SessionConfig;
use crate::index::LocalIndex;
use crate::pager::{Pager, DEFAULT_PAGE_SIZE};
use crate::search::SearchEngine;
use crate::sorting::merge_by_name;
use command::{Command, PageOp, Responder};
use orrery_protocol::{Cursor, Page, Record, RemoteSource, SourceError};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::AbortHandle;
use tracing::{debug, info, trace, warn};

/// Session errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session actor has shut down.
    #[error("Session is closed")]
    Closed,
}

/// Client handle to a running session. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ViewState>,
    index: LocalIndex,
}

impl SessionHandle {
    async fn request(
        &self,
        build: impl FnOnce(Responder) -> Command,
    ) -> Result<(), SessionError> {
        let (respond, done) = oneshot::channel();
        self.cmd_tx
            .send(build(respond))
            .map_err(|_| SessionError::Closed)?;
        done.await.map_err(|_| SessionError::Closed)
    }

    /// Load (or reload) the first page. Resolves once it is applied.
    ///
    /// Ignored while searching or while anything is loading.
    pub async fn load_first_page(&self) -> Result<(), SessionError> {
        self.request(|respond| Command::LoadFirstPage { respond })
            .await
    }

    /// Show the next window, fetching the next server page if the local
    /// snapshot is exhausted. Resolves once the turn is applied.
    pub async fn next_page(&self) -> Result<(), SessionError> {
        self.request(|respond| Command::NextPage { respond }).await
    }

    pub async fn prev_page(&self) -> Result<(), SessionError> {
        self.request(|respond| Command::PrevPage { respond }).await
    }

    /// Record a query edit. The search itself runs after the debounce
    /// interval if no further edit arrives; an empty (trimmed) term returns
    /// to browsing.
    pub async fn set_search_term(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|respond| Command::SetSearchTerm { text, respond })
            .await
    }

    /// Acknowledge the current error.
    pub async fn dismiss_error(&self) -> Result<(), SessionError> {
        self.request(|respond| Command::DismissError { respond })
            .await
    }

    /// Make the next local-backend search fail with `error`.
    pub async fn fail_next_search(&self, error: SourceError) -> Result<(), SessionError> {
        self.request(|respond| Command::FailNextSearch { error, respond })
            .await
    }

    /// Stop the actor and abort every task it spawned.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(|respond| Command::Shutdown { respond }).await
    }

    /// Latest published state.
    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Wait until the published state satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&ViewState) -> bool,
    ) -> Result<ViewState, SessionError> {
        let mut rx = self.state.clone();
        let state = rx.wait_for(predicate).await.map_err(|_| SessionError::Closed)?;
        Ok(state.clone())
    }

    /// The session's local index.
    pub fn index(&self) -> &LocalIndex {
        &self.index
    }
}

/// Entry point for starting sessions.
pub struct Session;

impl Session {
    /// Spawn a session over `source` on the current tokio runtime.
    pub fn spawn<S: RemoteSource>(source: Arc<S>, config: &SessionConfig) -> SessionHandle {
        let index = LocalIndex::spawn();
        let backfill = Arc::new(BackfillWalker::new(
            Arc::clone(&source),
            index.clone(),
            config.background_backfill,
        ));
        let search = SearchEngine::new(
            config.search_backend,
            Arc::clone(&source),
            index.clone(),
            Arc::clone(&backfill),
        );

        let page_size = NonZeroUsize::new(config.page_size).unwrap_or_else(|| {
            warn!(page_size = config.page_size, "Invalid page size, using default");
            DEFAULT_PAGE_SIZE
        });

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ViewState::default());

        let actor = SessionActor {
            source,
            index: index.clone(),
            backfill,
            search,
            self_tx: cmd_tx.downgrade(),
            state_tx,
            debounce: config.debounce_interval(),
            pager: Pager::new(page_size),
            browsing: Vec::new(),
            next_cursor: None,
            visible: Vec::new(),
            mode: Mode::Browsing,
            direction: PageDirection::Forward,
            error: None,
            paging: None,
            debounce_generation: 0,
            debounce_task: None,
            last_emitted_term: None,
            search_generation: 0,
            search_task: None,
            tasks: TaskBag::new(),
        };

        info!(
            page_size = page_size.get(),
            debounce_ms = config.debounce_interval_ms,
            backfill = config.background_backfill,
            backend = %config.search_backend,
            "Session started"
        );
        tokio::spawn(actor.run(cmd_rx));

        SessionHandle {
            cmd_tx,
            state: state_rx,
            index,
        }
    }
}

/// The paging fetch currently outstanding. At most one exists.
struct PendingPaging {
    respond: Responder,
    task: AbortHandle,
}

struct SessionActor<S: RemoteSource> {
    source: Arc<S>,
    index: LocalIndex,
    backfill: Arc<BackfillWalker<S>>,
    search: SearchEngine<S>,
    /// Weak so that dropping every handle stops the actor.
    self_tx: mpsc::WeakUnboundedSender<Command>,
    state_tx: watch::Sender<ViewState>,
    debounce: Duration,

    pager: Pager,
    /// Everything browsing has fetched, deduped and in name order.
    browsing: Vec<Record>,
    /// Server continuation for browsing.
    next_cursor: Option<Cursor>,
    visible: Vec<Record>,
    mode: Mode,
    direction: PageDirection,
    error: Option<String>,

    paging: Option<PendingPaging>,
    debounce_generation: u64,
    debounce_task: Option<AbortHandle>,
    last_emitted_term: Option<String>,
    search_generation: u64,
    search_task: Option<AbortHandle>,
    tasks: TaskBag,
}

impl<S: RemoteSource> SessionActor<S> {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            trace!(command = command.name(), "Session command");
            let keep_running = self.handle(command);
            self.publish();
            if !keep_running {
                break;
            }
        }
        self.teardown();
        info!("Session stopped");
    }

    /// Apply one command. Returns false when the actor should stop.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::LoadFirstPage { respond } => self.load_first_page(respond),
            Command::NextPage { respond } => self.next_page(respond),
            Command::PrevPage { respond } => {
                self.prev_page();
                let _ = respond.send(());
            }
            Command::SetSearchTerm { text, respond } => {
                self.schedule_search(text);
                let _ = respond.send(());
            }
            Command::DismissError { respond } => {
                self.error = None;
                let _ = respond.send(());
            }
            Command::FailNextSearch { error, respond } => {
                self.search.fail_next_search(error);
                let _ = respond.send(());
            }
            Command::Shutdown { respond } => {
                self.teardown();
                let _ = respond.send(());
                return false;
            }
            Command::PageLoaded { op, result } => self.apply_page(op, result),
            Command::SearchDue { generation, term } => self.search_due(generation, term),
            Command::SearchFinished { generation, result } => {
                self.apply_search(generation, result)
            }
        }
        true
    }

    fn is_loading(&self) -> bool {
        self.paging.is_some() || self.search_task.is_some()
    }

    fn refresh_window(&mut self) {
        self.visible = self.pager.slice(&self.browsing).to_vec();
    }

    // Browsing

    fn load_first_page(&mut self, respond: Responder) {
        if self.mode != Mode::Browsing || self.is_loading() {
            debug!(mode = ?self.mode, "load_first_page ignored");
            let _ = respond.send(());
            return;
        }
        self.spawn_fetch(PageOp::First, None, respond);
    }

    fn next_page(&mut self, respond: Responder) {
        if self.mode != Mode::Browsing {
            debug!("next_page ignored while searching");
            let _ = respond.send(());
            return;
        }
        self.direction = PageDirection::Forward;

        if self.pager.step_forward_if_possible(self.browsing.len()) {
            self.refresh_window();
            let _ = respond.send(());
            return;
        }

        match self.next_cursor.clone() {
            Some(cursor) if !self.is_loading() => {
                self.spawn_fetch(PageOp::Next, Some(cursor), respond)
            }
            _ => {
                debug!(
                    has_cursor = self.next_cursor.is_some(),
                    "next_page ignored: nothing further to show"
                );
                let _ = respond.send(());
            }
        }
    }

    fn prev_page(&mut self) {
        if self.mode != Mode::Browsing {
            debug!("prev_page ignored while searching");
            return;
        }
        self.direction = PageDirection::Backward;
        if self.pager.step_backward() {
            self.refresh_window();
        }
    }

    fn spawn_fetch(&mut self, op: PageOp, cursor: Option<Cursor>, respond: Responder) {
        let source = Arc::clone(&self.source);
        let index = self.index.clone();
        let tx = self.self_tx.clone();

        let handle = tokio::spawn(async move {
            let result = match &cursor {
                Some(cursor) => source.fetch_at(cursor).await,
                None => source.fetch_first().await,
            };
            if let Ok(page) = &result {
                if let Err(err) = index.ingest(page.clone()).await {
                    warn!(error = %err, "Fetched page not indexed");
                }
            }
            post(&tx, Command::PageLoaded { op, result });
        });

        self.tasks.insert(handle.abort_handle());
        self.paging = Some(PendingPaging {
            respond,
            task: handle.abort_handle(),
        });
    }

    fn apply_page(&mut self, op: PageOp, result: Result<Page, SourceError>) {
        let pending = self.paging.take();

        match result {
            Ok(page) => {
                let received = page.records.len();
                match op {
                    PageOp::First => {
                        self.browsing.clear();
                        merge_by_name(&mut self.browsing, page.records);
                        self.next_cursor = page.cursor;
                        self.pager.reset();
                    }
                    PageOp::Next => {
                        merge_by_name(&mut self.browsing, page.records);
                        self.next_cursor = page.cursor;
                        self.pager.step_forward_if_possible(self.browsing.len());
                    }
                }
                if self.mode == Mode::Browsing {
                    self.refresh_window();
                }
                debug!(
                    ?op,
                    received,
                    browsing = self.browsing.len(),
                    page = self.pager.current_page(),
                    has_cursor = self.next_cursor.is_some(),
                    "Page applied"
                );
            }
            Err(err) => {
                warn!(?op, error = %err, "Page fetch failed");
                self.error = Some(err.user_message());
            }
        }

        if let Some(pending) = pending {
            let _ = pending.respond.send(());
        }
    }

    // Search

    fn schedule_search(&mut self, text: String) {
        self.debounce_generation += 1;
        if let Some(task) = self.debounce_task.take() {
            task.abort();
        }

        let generation = self.debounce_generation;
        let delay = self.debounce;
        let tx = self.self_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            post(&tx, Command::SearchDue { generation, term: text });
        });
        self.tasks.insert(handle.abort_handle());
        self.debounce_task = Some(handle.abort_handle());
    }

    fn search_due(&mut self, generation: u64, term: String) {
        if generation != self.debounce_generation {
            debug!(generation, current = self.debounce_generation, "Superseded search edit dropped");
            return;
        }
        self.debounce_task = None;

        if self.last_emitted_term.as_deref() == Some(term.as_str()) {
            debug!(term = %term, "Repeated search term dropped");
            return;
        }
        self.last_emitted_term = Some(term.clone());
        self.start_search(&term);
    }

    fn cancel_search(&mut self) {
        // Bumping the generation also invalidates a result already queued.
        self.search_generation += 1;
        if let Some(task) = self.search_task.take() {
            task.abort();
        }
    }

    fn start_search(&mut self, term: &str) {
        self.cancel_search();

        let query = term.trim();
        if query.is_empty() {
            self.mode = Mode::Browsing;
            self.refresh_window();
            debug!(page = self.pager.current_page(), "Search cleared, browsing restored");
            return;
        }

        self.mode = Mode::Searching;
        let generation = self.search_generation;
        let search = self.search.run(query);
        let tx = self.self_tx.clone();
        let handle = tokio::spawn(async move {
            let result = search.await;
            post(&tx, Command::SearchFinished { generation, result });
        });
        self.tasks.insert(handle.abort_handle());
        self.search_task = Some(handle.abort_handle());
        debug!(query, generation, "Search issued");
    }

    fn apply_search(&mut self, generation: u64, result: Result<Vec<Record>, SourceError>) {
        if generation != self.search_generation {
            debug!(generation, current = self.search_generation, "Stale search result discarded");
            return;
        }
        self.search_task = None;

        match result {
            Ok(results) => {
                if self.mode == Mode::Searching {
                    self.visible = results;
                }
            }
            Err(err) => {
                warn!(error = %err, "Search failed");
                self.error = Some(err.user_message());
            }
        }
    }

    // Publishing

    fn view(&self) -> ViewState {
        let loading = self.is_loading();
        let total = self.browsing.len();
        let has_server_paging = self.next_cursor.is_some();
        ViewState {
            visible: self.visible.clone(),
            loading,
            error: self.error.clone(),
            mode: self.mode,
            current_page: self.pager.current_page(),
            total_pages: if has_server_paging {
                TotalPages::Unknown
            } else {
                TotalPages::Known(self.pager.total_pages(total))
            },
            has_server_paging,
            can_load_more: self.mode == Mode::Browsing
                && !loading
                && (has_server_paging || self.pager.has_next(total)),
            page_direction: self.direction,
        }
    }

    fn publish(&self) {
        let next = self.view();
        self.state_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn teardown(&mut self) {
        if let Some(pending) = self.paging.take() {
            pending.task.abort();
        }
        self.search_task = None;
        self.debounce_task = None;
        self.tasks.cancel_all();
        self.backfill.shutdown();
    }
}

/// Deliver a task's outcome to the actor, if it is still running.
fn post(tx: &mpsc::WeakUnboundedSender<Command>, command: Command) {
    match tx.upgrade() {
        Some(tx) => {
            if tx.send(command).is_err() {
                trace!("Session gone, task outcome dropped");
            }
        }
        None => trace!("Session gone, task outcome dropped"),
    }
}
