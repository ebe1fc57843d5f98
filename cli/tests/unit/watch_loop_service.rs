//! Unit tests for the watch loop, driven by a scripted backend.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;

use foreman_enc::application::services::dispatch::WorkerPool;
use foreman_enc::application::services::fact_upload::FactUploader;
use foreman_enc::application::services::watch_loop::{WatchPlan, run_watch_loop};
use foreman_enc::domain::config::FactExtension;
use foreman_enc::domain::error::WatchError;
use foreman_enc::infra::facts::FactDirectory;
use tempfile::TempDir;

use crate::mocks::{
    FixedIdentity, MemoryCache, RecordingApi, ScriptedBackend, dir_event, file_event, removed_event,
};

struct Harness {
    root: TempDir,
    api: Arc<RecordingApi>,
    uploader: FactUploader,
}

impl Harness {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let api = Arc::new(RecordingApi::serving(""));
        let uploader = FactUploader::new(
            api.clone(),
            Arc::new(MemoryCache::default()),
            Arc::new(FactDirectory::new(root.path().to_path_buf(), FactExtension::Yaml)),
            Arc::new(FixedIdentity("master.example.com")),
        );
        Self { root, api, uploader }
    }

    fn fact(&self, name: &str) -> PathBuf {
        let path = self.root.path().join(name);
        std::fs::write(&path, "values:\n  os: linux\n").unwrap();
        path
    }

    fn plan(&self, existing: Vec<PathBuf>, limit: Option<usize>) -> WatchPlan {
        WatchPlan {
            fact_dir: self.root.path().to_path_buf(),
            extension: FactExtension::Yaml,
            existing,
            limit,
        }
    }

    /// Run the loop to completion and return the number of jobs processed.
    fn run(&self, backend: &mut ScriptedBackend, plan: &WatchPlan) -> Result<usize, WatchError> {
        let (pool, sender) = WorkerPool::start(2, &self.uploader).unwrap();
        let result = run_watch_loop(backend, plan, &sender);
        drop(sender);
        let processed = pool.join();
        result.map(|()| processed)
    }
}

#[test]
fn test_moved_in_file_produces_exactly_one_job() {
    let h = Harness::new();
    let path = h.fact("hostA.yaml");
    let mut backend = ScriptedBackend::new(vec![vec![dir_event("hostA.yaml")]]);

    let processed = h.run(&mut backend, &h.plan(Vec::new(), None)).unwrap();
    assert_eq!(processed, 1);
    assert_eq!(h.api.uploaded_certnames(), vec!["hostA".to_string()]);
    assert!(backend.handle_of(&path).is_some(), "new file must be watched");
}

#[test]
fn test_other_extension_produces_no_job() {
    let h = Harness::new();
    h.fact("hostA.json");
    let mut backend = ScriptedBackend::new(vec![vec![dir_event("hostA.json"), dir_event(".hostA.yaml.swp")]]);

    let processed = h.run(&mut backend, &h.plan(Vec::new(), None)).unwrap();
    assert_eq!(processed, 0);
    assert!(backend.watched.is_empty());
}

#[test]
fn test_existing_files_are_watched_and_routed() {
    let h = Harness::new();
    let a = h.fact("a.yaml");
    let b = h.fact("b.yaml");
    // Handles are assigned in subscription order: a=100, b=101.
    let mut backend = ScriptedBackend::new(vec![vec![file_event(101, false)]]);

    let processed = h.run(&mut backend, &h.plan(vec![a.clone(), b.clone()], Some(10))).unwrap();
    assert_eq!(processed, 1);
    assert_eq!(h.api.uploaded_certnames(), vec!["b".to_string()]);
    assert_eq!(backend.watched.len(), 2, "plain close-write must not resubscribe");
    assert_eq!(backend.handle_of(&a), Some(100));
}

#[test]
fn test_oneshot_event_renews_the_watch() {
    let h = Harness::new();
    let a = h.fact("a.yaml");
    let mut backend = ScriptedBackend::new(vec![vec![file_event(100, true)]]);

    h.run(&mut backend, &h.plan(vec![a.clone()], None)).unwrap();
    assert_eq!(backend.watched.len(), 2);
    assert_eq!(backend.handle_of(&a), Some(101));
}

#[test]
fn test_watch_limit_exceeded_subscribes_nothing() {
    let h = Harness::new();
    let files = vec![h.fact("a.yaml"), h.fact("b.yaml"), h.fact("c.yaml")];
    let mut backend = ScriptedBackend::new(vec![vec![dir_event("a.yaml")]]);

    let err = h.run(&mut backend, &h.plan(files, Some(2))).unwrap_err();
    assert!(matches!(err, WatchError::LimitExceeded { limit: 2, files: 3 }));
    assert_eq!(err.exit_code(), 2);
    assert!(backend.watched.is_empty());
    assert_eq!(h.api.upload_count(), 0);
}

#[test]
fn test_vanished_file_is_skipped_and_watching_continues() {
    let h = Harness::new();
    let gone = h.root.path().join("gone.yaml");
    h.fact("later.yaml");
    let mut backend = ScriptedBackend::new(vec![
        vec![dir_event("gone.yaml")],
        vec![dir_event("later.yaml")],
    ])
    .refusing(&gone);

    let processed = h.run(&mut backend, &h.plan(Vec::new(), None)).unwrap();
    assert_eq!(processed, 1);
    assert_eq!(h.api.uploaded_certnames(), vec!["later".to_string()]);
    assert!(backend.handle_of(&gone).is_none());
}

#[test]
fn test_existing_file_that_cannot_be_watched_is_skipped() {
    let h = Harness::new();
    let gone = h.root.path().join("gone.yaml");
    let b = h.fact("b.yaml");
    // gone.yaml is refused, so b.yaml gets the first handle.
    let mut backend = ScriptedBackend::new(vec![vec![file_event(100, false)]]).refusing(&gone);

    let processed = h.run(&mut backend, &h.plan(vec![gone, b.clone()], None)).unwrap();
    assert_eq!(processed, 1);
    assert_eq!(backend.handle_of(&b), Some(100));
}

#[test]
fn test_removed_watch_no_longer_routes() {
    let h = Harness::new();
    let a = h.fact("a.yaml");
    let mut backend = ScriptedBackend::new(vec![
        vec![removed_event(100)],
        vec![file_event(100, false)],
    ]);

    let processed = h.run(&mut backend, &h.plan(vec![a], None)).unwrap();
    assert_eq!(processed, 0, "a removed watch must not produce jobs");
    assert_eq!(h.api.upload_count(), 0);
}
