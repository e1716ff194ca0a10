use orrery_protocol::{Cursor, Page, RemoteSource, SourceError};
use orrery_test_utils::{alphabet_records, names, ScriptedSource, SourceCall};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_scripted_pages_follow_cursors() {
    let source = ScriptedSource::new();
    source.set_first_page(Page::new(Some(Cursor::from("p2")), alphabet_records(2)));
    source.set_page("p2", Page::last(vec![orrery_test_utils::record("C")]));

    let first = source.fetch_first().await.unwrap();
    let cursor = first.cursor.clone().unwrap();
    let second = source.fetch_at(&cursor).await.unwrap();

    assert_eq!(names(&first.records), vec!["A", "B"]);
    assert_eq!(names(&second.records), vec!["C"]);
    assert_eq!(
        source.calls(),
        vec![SourceCall::FetchFirst, SourceCall::FetchAt("p2".to_string())]
    );
}

#[tokio::test]
async fn test_global_failure_overrides_script() {
    let source = ScriptedSource::new();
    source.set_first_page(Page::last(alphabet_records(1)));
    source.fail_all(SourceError::message("Boom"));

    assert_eq!(
        source.fetch_first().await.unwrap_err(),
        SourceError::message("Boom")
    );
    assert!(source.search("a").await.is_err());

    source.clear_failure();
    assert!(source.fetch_first().await.is_ok());
}

#[tokio::test]
async fn test_gate_holds_fetch_at_until_released() {
    let source = Arc::new(ScriptedSource::new());
    source.set_page("p2", Page::last(alphabet_records(1)));
    source.hold_fetch_at();

    let task_source = Arc::clone(&source);
    let mut pending =
        tokio::spawn(async move { task_source.fetch_at(&Cursor::from("p2")).await });

    let early = tokio::time::timeout(Duration::from_millis(50), &mut pending).await;
    assert!(early.is_err(), "fetch_at should wait for the gate");
    assert_eq!(source.fetch_at_calls(), vec!["p2"]);

    source.release_fetch_at();
    let page = pending.await.unwrap().unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(source.peak_concurrent_fetch_at(), 1);
}
