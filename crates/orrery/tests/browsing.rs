//! Browsing through the session: local slicing, server paging, errors.

use orrery::{Mode, PageDirection, SearchBackend, Session, SessionConfig, SessionHandle, TotalPages};
use orrery_protocol::{Cursor, Page, SourceError};
use orrery_test_utils::{alphabet_records, names, record, ScriptedSource};
use std::sync::Arc;
use std::time::Duration;

fn config(page_size: usize) -> SessionConfig {
    SessionConfig {
        page_size,
        debounce_interval_ms: 300,
        background_backfill: false,
        search_backend: SearchBackend::Remote,
    }
}

fn start(source: &Arc<ScriptedSource>, page_size: usize) -> SessionHandle {
    Session::spawn(Arc::clone(source), &config(page_size))
}

#[tokio::test]
async fn test_twelve_records_slice_locally() {
    let source = Arc::new(ScriptedSource::new());
    source.set_first_page(Page::last(alphabet_records(12)));
    let session = start(&source, 10);

    session.load_first_page().await.unwrap();
    let state = session.state();
    assert_eq!(
        state.visible_names(),
        vec!["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"]
    );
    assert_eq!(state.current_page_display(), 1);
    assert_eq!(state.total_pages.to_string(), "2");
    assert!(state.can_load_more);
    assert!(!state.has_server_paging);
    assert!(!state.loading);

    session.next_page().await.unwrap();
    let state = session.state();
    assert_eq!(state.visible_names(), vec!["K", "L"]);
    assert_eq!(state.current_page, 1);
    assert!(!state.can_load_more);
    assert_eq!(state.page_direction, PageDirection::Forward);

    session.prev_page().await.unwrap();
    let state = session.state();
    assert_eq!(state.visible_names().len(), 10);
    assert_eq!(state.visible_names()[0], "A");
    assert_eq!(state.page_direction, PageDirection::Backward);

    assert_eq!(source.fetch_first_count(), 1);
    assert!(source.fetch_at_calls().is_empty());
}

#[tokio::test]
async fn test_page_size_four_over_ten_records() {
    let source = Arc::new(ScriptedSource::new());
    source.set_first_page(Page::last(alphabet_records(10)));
    let session = start(&source, 4);
    session.load_first_page().await.unwrap();

    let mut windows = vec![session.state().visible_names().join("")];
    for _ in 0..3 {
        session.next_page().await.unwrap();
        windows.push(session.state().visible_names().join(""));
    }

    // The last step is a no-op: nothing further locally or on the server.
    assert_eq!(windows, vec!["ABCD", "EFGH", "IJ", "IJ"]);
    let state = session.state();
    assert_eq!(state.current_page, 2);
    assert_eq!(state.total_pages, TotalPages::Known(3));
    assert!(!state.can_load_more);
}

#[tokio::test]
async fn test_exact_page_size_has_no_next() {
    let source = Arc::new(ScriptedSource::new());
    source.set_first_page(Page::last(alphabet_records(10)));
    let session = start(&source, 10);
    session.load_first_page().await.unwrap();

    let state = session.state();
    assert!(!state.can_load_more);
    assert_eq!(state.total_pages, TotalPages::Known(1));
}

#[tokio::test]
async fn test_prev_on_first_page_stays_put() {
    let source = Arc::new(ScriptedSource::new());
    source.set_first_page(Page::last(alphabet_records(3)));
    let session = start(&source, 10);
    session.load_first_page().await.unwrap();

    session.prev_page().await.unwrap();
    let state = session.state();
    assert_eq!(state.current_page, 0);
    assert_eq!(state.visible_names(), vec!["A", "B", "C"]);
    assert_eq!(state.page_direction, PageDirection::Backward);
}

#[tokio::test]
async fn test_server_cursor_keeps_total_unknown_until_exhausted() {
    let source = Arc::new(ScriptedSource::new());
    source.set_first_page(Page::new(Some(Cursor::from("p2")), alphabet_records(10)));
    source.set_page(
        "p2",
        Page::last(vec![record("K"), record("L"), record("M")]),
    );
    let session = start(&source, 10);

    session.load_first_page().await.unwrap();
    let state = session.state();
    assert!(state.has_server_paging);
    assert_eq!(state.page_indicator(), "1 / ?");
    assert!(state.can_load_more);

    session.next_page().await.unwrap();
    let state = session.state();
    assert_eq!(state.visible_names(), vec!["K", "L", "M"]);
    assert_eq!(state.current_page, 1);
    assert!(!state.has_server_paging);
    assert_eq!(state.page_indicator(), "2 / 2");
    assert!(!state.can_load_more);

    assert_eq!(source.fetch_at_calls(), vec!["p2"]);
    assert_eq!(session.index().len(), 13);
}

#[tokio::test]
async fn test_merged_pages_are_deduped_and_resorted() {
    let source = Arc::new(ScriptedSource::new());
    source.set_first_page(Page::new(
        Some(Cursor::from("p2")),
        vec![record("Coruscant"), record("alderaan")],
    ));
    source.set_page(
        "p2",
        Page::last(vec![record("Bespin"), record("alderaan"), record("Dagobah")]),
    );
    let session = start(&source, 2);

    session.load_first_page().await.unwrap();
    assert_eq!(session.state().visible_names(), vec!["alderaan", "Coruscant"]);

    // Local window is exhausted, so this fetches p2, merges, re-sorts and
    // then advances one window over the merged snapshot.
    session.next_page().await.unwrap();
    assert_eq!(session.state().visible_names(), vec!["Coruscant", "Dagobah"]);

    session.prev_page().await.unwrap();
    assert_eq!(session.state().visible_names(), vec!["alderaan", "Bespin"]);
    assert_eq!(
        names(&session.index().snapshot()),
        vec!["Coruscant", "alderaan", "Bespin", "Dagobah"]
    );
}

#[tokio::test]
async fn test_first_page_failure_sets_error_and_clears_loading() {
    let source = Arc::new(ScriptedSource::new());
    source.fail_all(SourceError::message("FailFirst"));
    let session = start(&source, 10);

    session.load_first_page().await.unwrap();
    let state = session.state();
    assert_eq!(state.error.as_deref(), Some("FailFirst"));
    assert!(!state.loading);
    assert!(state.visible.is_empty());
    assert!(session.index().is_empty());

    session.dismiss_error().await.unwrap();
    assert!(session.state().error.is_none());
}

#[tokio::test]
async fn test_next_page_failure_keeps_current_window() {
    let source = Arc::new(ScriptedSource::new());
    source.set_first_page(Page::new(Some(Cursor::from("p2")), alphabet_records(10)));
    source.fail_page("p2", SourceError::message("FailNext"));
    let session = start(&source, 10);
    session.load_first_page().await.unwrap();

    session.next_page().await.unwrap();
    let state = session.state();
    assert_eq!(state.error.as_deref(), Some("FailNext"));
    assert_eq!(state.current_page, 0);
    assert_eq!(state.visible_names()[0], "A");
    assert!(!state.loading);
    // The cursor survives, so the user can try again.
    assert!(state.can_load_more);
}

#[tokio::test]
async fn test_error_kinds_map_to_user_messages() {
    let cases = [
        (SourceError::HttpStatus(500), "Server responded with status 500."),
        (SourceError::network("dns"), "Network connection appears to be offline."),
        (SourceError::decode("bad json"), "We couldn't read the server response."),
    ];

    for (error, expected) in cases {
        let source = Arc::new(ScriptedSource::new());
        source.fail_all(error);
        let session = start(&source, 10);
        session.load_first_page().await.unwrap();
        assert_eq!(session.state().error.as_deref(), Some(expected));
    }
}

#[tokio::test]
async fn test_paging_is_single_flight_while_loading() {
    let source = Arc::new(ScriptedSource::new());
    source.set_first_page(Page::new(Some(Cursor::from("p2")), alphabet_records(10)));
    source.set_page("p2", Page::last(vec![record("K")]));
    let session = start(&source, 10);
    session.load_first_page().await.unwrap();

    source.hold_fetch_at();
    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.next_page().await })
    };

    let state = session.wait_for(|s| s.loading).await.unwrap();
    assert!(!state.can_load_more);

    // Guarded while loading: neither call issues another fetch.
    session.next_page().await.unwrap();
    session.load_first_page().await.unwrap();
    assert_eq!(source.fetch_at_calls(), vec!["p2"]);
    assert_eq!(source.fetch_first_count(), 1);

    source.release_fetch_at();
    pending.await.unwrap().unwrap();
    let state = session.state();
    assert!(!state.loading);
    assert_eq!(state.visible_names(), vec!["K"]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_first_page_reports_loading_until_it_lands() {
    let source = Arc::new(ScriptedSource::new());
    source.set_first_page(Page::last(alphabet_records(3)));
    source.set_fetch_latency(Duration::from_secs(1));
    let session = start(&source, 10);

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.load_first_page().await })
    };

    let state = session.wait_for(|s| s.loading).await.unwrap();
    assert!(state.visible.is_empty());
    assert!(!state.can_load_more);

    // A second reload while the first is in flight is dropped.
    session.load_first_page().await.unwrap();
    assert_eq!(source.fetch_first_count(), 1);

    pending.await.unwrap().unwrap();
    let state = session.state();
    assert!(!state.loading);
    assert_eq!(state.visible_names(), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_zero_page_size_falls_back_to_ten() {
    let source = Arc::new(ScriptedSource::new());
    source.set_first_page(Page::last(alphabet_records(12)));
    let session = start(&source, 0);

    session.load_first_page().await.unwrap();
    let state = session.state();
    assert_eq!(state.visible_names().len(), 10);
    assert_eq!(state.total_pages.to_string(), "2");
}

#[tokio::test]
async fn test_reload_resets_to_first_page() {
    let source = Arc::new(ScriptedSource::new());
    source.set_first_page(Page::last(alphabet_records(12)));
    let session = start(&source, 10);
    session.load_first_page().await.unwrap();
    session.next_page().await.unwrap();
    assert_eq!(session.state().current_page, 1);

    session.load_first_page().await.unwrap();
    let state = session.state();
    assert_eq!(state.current_page, 0);
    assert_eq!(state.mode, Mode::Browsing);
    assert_eq!(source.fetch_first_count(), 2);
}

#[tokio::test]
async fn test_handle_reports_closed_after_shutdown() {
    let source = Arc::new(ScriptedSource::new());
    let session = start(&source, 10);
    session.shutdown().await.unwrap();

    assert!(session.load_first_page().await.is_err());
}
