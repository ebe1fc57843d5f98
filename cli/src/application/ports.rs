//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `foreman_common` — never
//! from `crate::infra` or `crate::commands`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Result;
use foreman_common::{ConfigReport, FactUploadBody};
use serde_json::Value;

use crate::domain::{
    CacheReadError, FactFileError, NodeRetrievalError, Settings, UploadError, WatchError,
    WatchEvent,
};

// ── Settings Port ─────────────────────────────────────────────────────────────

/// Source of the agent settings.
pub trait SettingsSource {
    /// Load and validate the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be read or are incomplete.
    fn load(&self) -> Result<Settings>;
    /// Path the settings are read from.
    fn path(&self) -> PathBuf;
}

// ── Foreman API Ports ─────────────────────────────────────────────────────────

/// Calls into the Foreman HTTP API used by the ENC and fact uploads.
pub trait ForemanApi: Send + Sync {
    /// `POST /api/hosts/facts`; any 2xx is success.
    fn upload_facts(&self, body: &FactUploadBody) -> Result<(), UploadError>;
    /// `GET /node/<certname>?format=yml`; only 200 is success.
    fn fetch_node(&self, certname: &str) -> Result<String, NodeRetrievalError>;
    /// URL facts are uploaded to, for upload markers and logs.
    fn facts_url(&self) -> String;
}

/// Delivery of converted config reports.
pub trait ReportSink {
    /// `POST /api/config_reports` once; retries are the caller's business.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason on transport failure or non-2xx status.
    fn send_report(&self, report: &ConfigReport) -> std::result::Result<(), String>;
    /// URL reports are sent to.
    fn reports_url(&self) -> String;
}

// ── Cache Port ────────────────────────────────────────────────────────────────

/// Keyed store of marker files whose mtime doubles as a freshness signal.
pub trait FreshnessCache: Send + Sync {
    /// Persist `content` under `key`, creating the cache directory if needed.
    ///
    /// # Errors
    ///
    /// Propagates any I/O failure.
    fn write(&self, key: &str, content: &str) -> std::io::Result<()>;
    /// Content stored under `key`.
    ///
    /// # Errors
    ///
    /// Fails when the entry is missing or unreadable.
    fn read(&self, key: &str) -> std::result::Result<String, CacheReadError>;
    /// `true` iff an entry exists and was written at or after `reference`.
    fn is_fresh(&self, key: &str, reference: SystemTime) -> bool;
}

// ── Fact file Port ────────────────────────────────────────────────────────────

/// Size and modification time of a fact file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub len: u64,
    pub modified: SystemTime,
}

/// Access to the fact and node files written by the Puppet server.
pub trait FactSource: Send + Sync {
    /// Default fact file for `certname`.
    fn fact_path(&self, certname: &str) -> PathBuf;
    /// Every fact file currently present.
    ///
    /// # Errors
    ///
    /// Returns an error if the fact directory cannot be listed.
    fn fact_files(&self) -> Result<Vec<PathBuf>>;
    /// `None` when the file does not exist.
    fn stat(&self, path: &Path) -> Option<FileStat>;
    /// Parse a fact or node file, format chosen by its extension.
    fn load(&self, path: &Path) -> std::result::Result<Value, FactFileError>;
}

// ── Identity Port ─────────────────────────────────────────────────────────────

/// Fully qualified domain name of the host running the agent.
pub trait LocalIdentity: Send + Sync {
    fn fqdn(&self) -> String;
}

// ── Watch Port ────────────────────────────────────────────────────────────────

/// Low-level filesystem notification channel.
///
/// The backend subscribes to the fact directory itself when it is created;
/// per-file close-after-write watches are added through `watch_file`.
pub trait WatchBackend {
    type Handle: Copy + Eq + std::hash::Hash;

    /// Watch `path` for close-after-write.
    ///
    /// # Errors
    ///
    /// Returns an error if the watch cannot be registered.
    fn watch_file(&mut self, path: &Path) -> std::result::Result<Self::Handle, WatchError>;

    /// Block for the next batch of events; `None` once the channel is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the channel fails.
    fn next_events(
        &mut self,
    ) -> std::result::Result<Option<Vec<WatchEvent<Self::Handle>>>, WatchError>;
}
