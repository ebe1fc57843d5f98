//! Shared mock infrastructure for unit tests.
//!
//! Provides recording [`ForemanApi`] / [`ReportSink`] implementations, an
//! in-memory cache, and a scripted watch backend so each test file doesn't
//! have to re-define the same boilerplate.

#![allow(clippy::expect_used, clippy::unwrap_used, dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use foreman_common::{ConfigReport, FactUploadBody};
use foreman_enc::application::ports::{ForemanApi, FreshnessCache, LocalIdentity, ReportSink, WatchBackend};
use foreman_enc::domain::error::{CacheReadError, NodeRetrievalError, UploadError, WatchError};
use foreman_enc::domain::watch::WatchEvent;

// ── Foreman API ───────────────────────────────────────────────────────────────

/// How the fake node endpoint answers.
#[derive(Debug, Clone)]
pub enum NodeReply {
    Document(String),
    Status(u16),
    Unreachable,
}

/// Records every upload and serves a canned node response.
pub struct RecordingApi {
    pub uploads: Mutex<Vec<FactUploadBody>>,
    pub node_requests: Mutex<Vec<String>>,
    pub node_reply: NodeReply,
    /// Status returned by every upload; `None` accepts it.
    pub reject_uploads: Option<u16>,
    /// Sleep before answering a node request.
    pub node_delay: Option<Duration>,
}

impl RecordingApi {
    pub fn serving(document: &str) -> Self {
        Self::replying(NodeReply::Document(document.to_string()))
    }

    pub fn replying(node_reply: NodeReply) -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            node_requests: Mutex::new(Vec::new()),
            node_reply,
            reject_uploads: None,
            node_delay: None,
        }
    }

    pub fn uploaded_certnames(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .uploads
            .lock()
            .unwrap()
            .iter()
            .map(|b| b.certname.clone())
            .collect();
        names.sort();
        names
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

impl ForemanApi for RecordingApi {
    fn upload_facts(&self, body: &FactUploadBody) -> Result<(), UploadError> {
        if let Some(status) = self.reject_uploads {
            return Err(UploadError::Rejected {
                certname: body.certname.clone(),
                status,
                reason: "Unprocessable Entity".to_string(),
            });
        }
        self.uploads.lock().unwrap().push(body.clone());
        Ok(())
    }

    fn fetch_node(&self, certname: &str) -> Result<String, NodeRetrievalError> {
        self.node_requests.lock().unwrap().push(certname.to_string());
        if let Some(delay) = self.node_delay {
            std::thread::sleep(delay);
        }
        match &self.node_reply {
            NodeReply::Document(doc) => Ok(doc.clone()),
            NodeReply::Status(status) => Err(NodeRetrievalError::Status {
                certname: certname.to_string(),
                status: *status,
                reason: "Not Found".to_string(),
            }),
            NodeReply::Unreachable => Err(NodeRetrievalError::Transport {
                certname: certname.to_string(),
                message: "Connection refused".to_string(),
            }),
        }
    }

    fn facts_url(&self) -> String {
        "http://foreman.test/api/hosts/facts".to_string()
    }
}

// ── Report sink ───────────────────────────────────────────────────────────────

/// Fails the first `failures` deliveries, then accepts.
pub struct FlakySink {
    pub failures: usize,
    pub attempts: Mutex<usize>,
    pub delivered: Mutex<Vec<ConfigReport>>,
}

impl FlakySink {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            attempts: Mutex::new(0),
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

impl ReportSink for FlakySink {
    fn send_report(&self, report: &ConfigReport) -> Result<(), String> {
        let mut attempts = self.attempts.lock().unwrap();
        *attempts += 1;
        if *attempts <= self.failures {
            return Err("503 Service Unavailable".to_string());
        }
        self.delivered.lock().unwrap().push(report.clone());
        Ok(())
    }

    fn reports_url(&self) -> String {
        "http://foreman.test/api/config_reports".to_string()
    }
}

// ── Cache ─────────────────────────────────────────────────────────────────────

/// In-memory cache stamping entries with the wall clock.
#[derive(Default)]
pub struct MemoryCache {
    pub entries: Mutex<HashMap<String, (String, SystemTime)>>,
}

impl MemoryCache {
    pub fn with_entry(key: &str, content: &str) -> Self {
        let cache = Self::default();
        cache.write(key, content).unwrap();
        cache
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).map(|(c, _)| c.clone())
    }
}

impl FreshnessCache for MemoryCache {
    fn write(&self, key: &str, content: &str) -> std::io::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (content.to_string(), SystemTime::now()));
        Ok(())
    }

    fn read(&self, key: &str) -> Result<String, CacheReadError> {
        self.get(key).ok_or_else(|| CacheReadError {
            key: key.to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }

    fn is_fresh(&self, key: &str, reference: SystemTime) -> bool {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .is_some_and(|(_, written)| *written >= reference)
    }
}

// ── Identity ──────────────────────────────────────────────────────────────────

pub struct FixedIdentity(pub &'static str);

impl LocalIdentity for FixedIdentity {
    fn fqdn(&self) -> String {
        self.0.to_string()
    }
}

// ── Watch backend ─────────────────────────────────────────────────────────────

/// Replays scripted event batches; handles are assigned sequentially from 100.
pub struct ScriptedBackend {
    pub batches: VecDeque<Vec<WatchEvent<u32>>>,
    pub watched: Vec<(u32, PathBuf)>,
    /// Paths whose watch registration fails, as for a deleted file.
    pub refused: Vec<PathBuf>,
    next_handle: u32,
}

impl ScriptedBackend {
    pub fn new(batches: Vec<Vec<WatchEvent<u32>>>) -> Self {
        Self {
            batches: batches.into(),
            watched: Vec::new(),
            refused: Vec::new(),
            next_handle: 100,
        }
    }

    pub fn refusing(mut self, path: &Path) -> Self {
        self.refused.push(path.to_path_buf());
        self
    }

    pub fn handle_of(&self, path: &Path) -> Option<u32> {
        self.watched
            .iter()
            .rev()
            .find(|(_, p)| p == path)
            .map(|(h, _)| *h)
    }
}

impl WatchBackend for ScriptedBackend {
    type Handle = u32;

    fn watch_file(&mut self, path: &Path) -> Result<u32, WatchError> {
        if self.refused.iter().any(|p| p == path) {
            return Err(WatchError::Backend {
                action: "add watch",
                message: "No such file or directory".to_string(),
            });
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.watched.push((handle, path.to_path_buf()));
        Ok(handle)
    }

    fn next_events(&mut self) -> Result<Option<Vec<WatchEvent<u32>>>, WatchError> {
        Ok(self.batches.pop_front())
    }
}

/// Event on the directory watch (handle 1) naming `file`.
pub fn dir_event(file: &str) -> WatchEvent<u32> {
    WatchEvent {
        handle: 1,
        name: Some(file.into()),
        oneshot: false,
        removed: false,
    }
}

/// Close-after-write on an already watched file.
pub fn file_event(handle: u32, oneshot: bool) -> WatchEvent<u32> {
    WatchEvent {
        handle,
        name: None,
        oneshot,
        removed: false,
    }
}

/// The kernel dropped the watch behind `handle`.
pub fn removed_event(handle: u32) -> WatchEvent<u32> {
    WatchEvent {
        handle,
        name: None,
        oneshot: false,
        removed: true,
    }
}
