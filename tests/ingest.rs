mod common;

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assistant_console::ingest::{UPLOAD_CONCURRENCY, index_dir, index_file};
use assistant_console::{ConsoleError, Dispatch, DispatchError, DispatchResult, Endpoint};
use async_trait::async_trait;
use serde_json::{Value, json};

use common::ScriptedDispatch;

#[tokio::test]
async fn single_file_reports_stored_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("manual.pdf");
    fs::write(&file, b"%PDF").expect("write");

    let dispatcher = ScriptedDispatch::new();
    dispatcher.reply(Ok(json!({"filename": "manual.pdf"})));

    let indexed = index_file(&*dispatcher, &file).await.expect("indexed");
    assert_eq!(indexed.name, "manual.pdf");
    assert_eq!(dispatcher.calls()[0].1, Some(json!("manual.pdf")));
}

#[tokio::test]
async fn unreadable_file_fails_before_upload() {
    let dispatcher = ScriptedDispatch::new();
    let err = index_file(&*dispatcher, std::path::Path::new("/nonexistent/file.txt"))
        .await
        .expect_err("missing");
    assert!(matches!(err, ConsoleError::Validation(_)));
    assert!(dispatcher.calls().is_empty());
}

#[tokio::test]
async fn directory_upload_collects_successes_and_failures() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("nested")).expect("mkdir");
    fs::write(dir.path().join("a.txt"), "a").expect("write");
    fs::write(dir.path().join("nested/b.txt"), "b").expect("write");

    let dispatcher = ScriptedDispatch::new();
    dispatcher
        .reply(Ok(json!({"filename": "stored"})))
        .reply(Err(DispatchError::Api {
            status: 200,
            body: "unsupported format".into(),
        }));

    let summary = index_dir(&*dispatcher, dir.path()).await.expect("summary");
    assert_eq!(summary.indexed.len(), 1);
    assert_eq!(summary.failed.len(), 1);
    assert!(!summary.is_clean());
    assert_eq!(dispatcher.calls().len(), 2);
}

#[tokio::test]
async fn directory_upload_rejects_plain_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("a.txt");
    fs::write(&file, "a").expect("write");

    let err = index_dir(&*ScriptedDispatch::new(), &file)
        .await
        .expect_err("not a dir");
    assert!(matches!(err, ConsoleError::Validation(_)));
}

/// Accepts every upload after a short pause, tracking how many overlap.
#[derive(Default)]
struct CountingUploads {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    done: AtomicUsize,
}

#[async_trait]
impl Dispatch for CountingUploads {
    async fn dispatch(&self, endpoint: Endpoint, _payload: Option<Value>) -> DispatchResult {
        Err(DispatchError::Network(format!("unexpected {endpoint}")))
    }

    async fn upload(&self, file_name: String, _bytes: Vec<u8>) -> DispatchResult {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.done.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"filename": file_name}))
    }
}

#[tokio::test]
async fn directory_upload_is_bounded() {
    let dir = tempfile::tempdir().expect("tempdir");
    for n in 0..12 {
        fs::write(dir.path().join(format!("doc{n}.txt")), format!("doc {n}")).expect("write");
    }

    let dispatcher = CountingUploads::default();
    let summary = index_dir(&dispatcher, dir.path()).await.expect("summary");

    assert!(summary.is_clean());
    assert_eq!(summary.indexed.len(), 12);
    assert_eq!(dispatcher.done.load(Ordering::SeqCst), 12);
    let peak = dispatcher.peak.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= UPLOAD_CONCURRENCY, "peak was {peak}");
}
