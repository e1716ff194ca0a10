//! Scriptable remote source.
//!
//! Responses are scripted per cursor / per query. Every call is logged
//! before any simulated latency so tests can observe in-flight requests.
//! `fetch_at` can be held behind a gate to keep a request outstanding.

use orrery_protocol::{Cursor, Page, RemoteSource, SourceError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// A call observed by [`ScriptedSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    FetchFirst,
    FetchAt(String),
    Search(String),
}

#[derive(Default)]
struct Script {
    first_page: Option<Page>,
    pages: HashMap<String, Result<Page, SourceError>>,
    search_results: HashMap<String, Page>,
    default_search: Option<Page>,
    search_latency: HashMap<String, Duration>,
    fetch_latency: Duration,
    failure: Option<SourceError>,
}

/// In-memory [`RemoteSource`] driven by a test script.
pub struct ScriptedSource {
    script: Mutex<Script>,
    calls: Mutex<Vec<SourceCall>>,
    /// `true` while `fetch_at` is allowed to proceed.
    gate: watch::Sender<bool>,
    active_fetch_at: AtomicUsize,
    peak_fetch_at: AtomicUsize,
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSource {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            script: Mutex::new(Script::default()),
            calls: Mutex::new(Vec::new()),
            gate,
            active_fetch_at: AtomicUsize::new(0),
            peak_fetch_at: AtomicUsize::new(0),
        }
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("script lock poisoned")
    }

    pub fn set_first_page(&self, page: Page) {
        self.script().first_page = Some(page);
    }

    pub fn set_page(&self, cursor: &str, page: Page) {
        self.script().pages.insert(cursor.to_string(), Ok(page));
    }

    /// Make `fetch_at(cursor)` fail with `error`.
    pub fn fail_page(&self, cursor: &str, error: SourceError) {
        self.script().pages.insert(cursor.to_string(), Err(error));
    }

    pub fn set_search_results(&self, query: &str, page: Page) {
        self.script().search_results.insert(query.to_string(), page);
    }

    /// Results for any query without a specific script.
    pub fn set_default_search(&self, page: Page) {
        self.script().default_search = Some(page);
    }

    pub fn set_search_latency(&self, query: &str, latency: Duration) {
        self.script().search_latency.insert(query.to_string(), latency);
    }

    pub fn set_fetch_latency(&self, latency: Duration) {
        self.script().fetch_latency = latency;
    }

    /// Fail every call with `error` until cleared.
    pub fn fail_all(&self, error: SourceError) {
        self.script().failure = Some(error);
    }

    pub fn clear_failure(&self) {
        self.script().failure = None;
    }

    /// Hold every `fetch_at` call until [`ScriptedSource::release_fetch_at`].
    pub fn hold_fetch_at(&self) {
        self.gate.send_replace(false);
    }

    pub fn release_fetch_at(&self) {
        self.gate.send_replace(true);
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().expect("call log lock poisoned").clone()
    }

    pub fn fetch_at_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SourceCall::FetchAt(cursor) => Some(cursor),
                _ => None,
            })
            .collect()
    }

    pub fn search_queries(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SourceCall::Search(query) => Some(query),
                _ => None,
            })
            .collect()
    }

    pub fn fetch_first_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == SourceCall::FetchFirst)
            .count()
    }

    /// Highest number of `fetch_at` calls outstanding at the same time.
    pub fn peak_concurrent_fetch_at(&self) -> usize {
        self.peak_fetch_at.load(Ordering::SeqCst)
    }

    fn record(&self, call: SourceCall) {
        debug!(?call, "scripted source call");
        self.calls.lock().expect("call log lock poisoned").push(call);
    }
}

impl RemoteSource for ScriptedSource {
    async fn fetch_first(&self) -> Result<Page, SourceError> {
        self.record(SourceCall::FetchFirst);
        let (latency, outcome) = {
            let script = self.script();
            let outcome = match (&script.failure, &script.first_page) {
                (Some(err), _) => Err(err.clone()),
                (None, Some(page)) => Ok(page.clone()),
                (None, None) => Err(SourceError::message("no first page scripted")),
            };
            (script.fetch_latency, outcome)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        outcome
    }

    async fn fetch_at(&self, cursor: &Cursor) -> Result<Page, SourceError> {
        self.record(SourceCall::FetchAt(cursor.as_str().to_string()));
        let active = self.active_fetch_at.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_fetch_at.fetch_max(active, Ordering::SeqCst);

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let (latency, outcome) = {
            let script = self.script();
            let outcome = match (&script.failure, script.pages.get(cursor.as_str())) {
                (Some(err), _) => Err(err.clone()),
                (None, Some(result)) => result.clone(),
                (None, None) => Err(SourceError::message(format!(
                    "no page scripted for cursor {}",
                    cursor
                ))),
            };
            (script.fetch_latency, outcome)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.active_fetch_at.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    async fn search(&self, query: &str) -> Result<Page, SourceError> {
        self.record(SourceCall::Search(query.to_string()));
        let (latency, outcome) = {
            let script = self.script();
            let latency = script
                .search_latency
                .get(query)
                .copied()
                .unwrap_or(Duration::ZERO);
            let outcome = match &script.failure {
                Some(err) => Err(err.clone()),
                None => Ok(script
                    .search_results
                    .get(query)
                    .or(script.default_search.as_ref())
                    .cloned()
                    .unwrap_or_default()),
            };
            (latency, outcome)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        outcome
    }
}
