//! End-to-end job runs against the stub engine.

#![cfg(unix)]

mod common;

use cerberus_core::{CerberusError, ErrorKind};
use cerberus_history::{FileHistory, HistoryStore};
use cerberus_pipeline::{EngineOptions, Pipeline};
use common::{stub_engine, Harness, HAPPY_REPORT};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_test::assert_ok;

#[tokio::test]
async fn test_happy_path_records_exact_report() {
    let h = Harness::new("ok");

    let record = h.pipeline.submit(b"0123456789", "a.bin").await.unwrap();

    let expected: Value = serde_json::from_str(HAPPY_REPORT).unwrap();
    assert_eq!(serde_json::to_value(&record.data).unwrap(), expected);
    assert_eq!(record.name, "a.bin");
    assert!(!record.id.as_str().is_empty());

    assert_eq!(h.history.len().await, 1);
    assert_eq!(h.pipeline.history().get(&record.id).await.unwrap(), record);
    assert!(h.leftovers().is_empty());
}

#[tokio::test]
async fn test_rich_report_keeps_unknown_fields() {
    let h = Harness::new("rich");

    let record = h.pipeline.submit(b"\x7fELF", "model.so").await.unwrap();
    let stats = record.stats();
    assert_eq!(stats.instructions, 1200);
    assert_eq!(stats.ml_operations, 2);
    assert_eq!(stats.frameworks, 1);
    assert_eq!(stats.sections, 1);

    let frameworks = record.data.framework_analysis.as_ref().unwrap();
    assert_eq!(frameworks.counts().get("pytorch"), Some(&2));
    assert_eq!(record.data.extra.get("engine_build"), Some(&json!("stub")));
}

#[tokio::test]
async fn test_engine_crash_is_not_extracted() {
    let h = Harness::new("crash");

    let err = h.pipeline.submit(b"x", "a.bin").await.unwrap_err();
    // The stub wrote a valid report before failing; it must be ignored.
    assert!(matches!(err, CerberusError::EngineExecutionFailed { code: 1 }));
    assert!(h.history.is_empty().await);
    assert!(h.leftovers().is_empty());
}

#[tokio::test]
async fn test_malformed_output() {
    let h = Harness::new("garbage");

    let err = h.pipeline.submit(b"x", "a.bin").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedOutput);
    assert!(err.is_output_failure());
    assert!(h.history.is_empty().await);
    assert!(h.leftovers().is_empty());
}

#[tokio::test]
async fn test_missing_output() {
    let h = Harness::new("silent");

    let err = h.pipeline.submit(b"x", "a.bin").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutputMissing);
    assert!(h.history.is_empty().await);
    assert!(h.leftovers().is_empty());
}

#[tokio::test]
async fn test_incomplete_output() {
    let h = Harness::new("incomplete");

    let err = h.pipeline.submit(b"x", "a.bin").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompleteResult);
    assert!(h.history.is_empty().await);
}

#[tokio::test]
async fn test_missing_engine() {
    let tmp = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::builder(tmp.path().join("no-engine"))
        .scratch_dir(tmp.path().join("jobs"))
        .build();

    let err = pipeline.submit(b"x", "a.bin").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineUnavailable);
    assert_eq!(
        std::fs::read_dir(tmp.path().join("jobs")).unwrap().count(),
        0
    );
    assert!(pipeline.history().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_timeout_kills_engine_and_its_children() {
    let pidfile = tempfile::NamedTempFile::new().unwrap();
    let pidpath = pidfile.path().to_path_buf();
    let h = Harness::with(
        "sleep",
        |options| options.env("STUB_PIDFILE", pidpath.display().to_string()),
        |builder| builder.timeout(Duration::from_millis(500)),
    );

    let started = Instant::now();
    let err = h.pipeline.submit(b"x", "a.bin").await.unwrap_err();
    assert!(matches!(err, CerberusError::Timeout(d) if d == Duration::from_millis(500)));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(h.history.is_empty().await);
    assert!(h.leftovers().is_empty());

    #[cfg(target_os = "linux")]
    common::assert_all_exited(&pidpath).await;
}

#[tokio::test]
async fn test_background_processes_do_not_outlive_the_job() {
    let pidfile = tempfile::NamedTempFile::new().unwrap();
    let pidpath = pidfile.path().to_path_buf();
    let h = Harness::with(
        "linger",
        |options| options.env("STUB_PIDFILE", pidpath.display().to_string()),
        |builder| builder,
    );

    assert_ok!(h.pipeline.submit(b"x", "a.bin").await);

    #[cfg(target_os = "linux")]
    common::assert_all_exited(&pidpath).await;
}

#[tokio::test]
async fn test_fifo_report_does_not_block() {
    let h = Harness::with("fifo", |options| options, |builder| {
        builder.timeout(Duration::from_millis(200))
    });

    let outcome = tokio::time::timeout(Duration::from_secs(5), h.pipeline.submit(b"x", "a.bin"))
        .await
        .expect("submit hung on a FIFO report");
    let err = outcome.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedOutput);
    assert!(err.to_string().contains("FIFO"), "{err}");
    assert!(h.history.is_empty().await);
    assert!(h.leftovers().is_empty());
}

#[tokio::test]
async fn test_options_reach_engine() {
    let h = Harness::with(
        "options",
        |options| options.include_strings(true).log_level("debug"),
        |builder| builder,
    );

    let record = h.pipeline.submit(b"x", "a.bin").await.unwrap();
    let metadata = record.data.metadata.unwrap();
    assert_eq!(metadata["include_strings"], json!("true"));
    assert_eq!(metadata["disassemble"], json!(""));
    assert_eq!(metadata["log_level"], json!("debug"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_jobs_stay_isolated() {
    let h = Harness::new("echo");
    let jobs = 8;

    let tasks: Vec<_> = (0..jobs)
        .map(|i| {
            let pipeline = h.pipeline.clone();
            tokio::spawn(async move {
                let payload = format!("payload-{i}");
                let record = pipeline.submit(payload.as_bytes(), "same.bin").await;
                (payload, record)
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for joined in futures_util::future::join_all(tasks).await {
        let (payload, record) = joined.unwrap();
        let record = record.unwrap();
        let metadata = record.data.metadata.as_ref().unwrap();
        assert_eq!(metadata["content"], json!(payload));
        ids.insert(record.id.clone());
    }

    assert_eq!(ids.len(), jobs);
    assert_eq!(h.history.len().await, jobs);
    assert!(h.leftovers().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_limit_still_completes_all_jobs() {
    let h = Harness::with("ok", |options| options, |builder| builder.max_concurrent_jobs(1));

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let pipeline = h.pipeline.clone();
            tokio::spawn(async move { pipeline.submit(b"x", &format!("job-{i}.bin")).await })
        })
        .collect();

    for joined in futures_util::future::join_all(tasks).await {
        assert_ok!(joined.unwrap());
    }
    assert_eq!(h.history.len().await, 4);
}

#[tokio::test]
async fn test_failure_does_not_affect_other_jobs() {
    let good = Harness::new("ok");
    let bad = Harness::new("crash");

    let (ok, failed) = tokio::join!(
        good.pipeline.submit(b"x", "good.bin"),
        bad.pipeline.submit(b"x", "bad.bin"),
    );
    assert_ok!(ok);
    assert!(failed.is_err());
    assert_eq!(good.history.len().await, 1);
}

#[tokio::test]
async fn test_hostile_name_is_contained() {
    let h = Harness::new("ok");

    let record = h.pipeline.submit(b"x", "../../escape.bin").await.unwrap();
    assert_eq!(record.name, "../../escape.bin");
    assert!(!h.tmp.path().join("escape.bin").exists());
    assert!(h.leftovers().is_empty());
}

#[tokio::test]
async fn test_submit_path_uses_file_name() {
    let h = Harness::new("ok");
    let input = h.tmp.path().join("resnet.onnx");
    std::fs::write(&input, b"weights").unwrap();

    let record = h.pipeline.submit_path(&input).await.unwrap();
    assert_eq!(record.name, "resnet.onnx");
    assert!(input.exists());

    let missing = h.pipeline.submit_path(&h.tmp.path().join("nope")).await;
    assert_eq!(missing.unwrap_err().kind(), ErrorKind::Io);
}

#[tokio::test]
async fn test_history_queries_and_export() {
    let h = Harness::new("rich");
    let first = h.pipeline.submit(b"x", "ResNet.so").await.unwrap();
    let second = h.pipeline.submit(b"y", "bert.dll").await.unwrap();

    let history = h.pipeline.history();
    let listed = history.list().await.unwrap();
    assert_eq!(listed, vec![second.clone(), first.clone()]);
    assert_eq!(history.list().await.unwrap(), listed);

    let hits = history.search("resnet").await.unwrap();
    assert_eq!(hits, vec![first.clone()]);

    let stats = history.stats().await.unwrap();
    assert_eq!(stats.analyses, 2);
    assert_eq!(stats.instructions, 2400);
    assert_eq!(stats.ml_operations, 4);

    let out = tempfile::tempdir().unwrap();
    let path = history.export(&first.id, out.path()).await.unwrap();
    assert_eq!(path, out.path().join("ResNet.so-analysis.json"));
    let exported: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(exported, serde_json::to_value(&first.data).unwrap());

    let unknown = cerberus_core::JobId::from("missing");
    assert_eq!(
        history.get(&unknown).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_file_history_survives_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let history_path = tmp.path().join("history.json");

    let record = {
        let store = Arc::new(FileHistory::open(&history_path).await.unwrap());
        let pipeline = Pipeline::builder(stub_engine())
            .scratch_dir(tmp.path().join("jobs"))
            .options(EngineOptions::new().env("STUB_MODE", "ok"))
            .history(store)
            .build();
        pipeline.submit(b"0123456789", "a.bin").await.unwrap()
    };

    let reopened = FileHistory::open(&history_path).await.unwrap();
    assert_eq!(reopened.get(&record.id).await.unwrap(), record);
}
