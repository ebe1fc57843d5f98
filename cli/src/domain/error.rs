//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use thiserror::Error;

// ── Settings errors ───────────────────────────────────────────────────────────

/// Errors raised while loading the settings file. All of them abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Must provide {key} in {}", path.display())]
    Missing { key: &'static str, path: PathBuf },

    #[error("cannot read settings file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse settings file {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid fact_extension '{0}' (valid values: yaml, json)")]
    InvalidFactExtension(String),
}

// ── Fact file errors ──────────────────────────────────────────────────────────

/// Errors raised while reading a fact or node file.
#[derive(Debug, Error)]
pub enum FactFileError {
    #[error("Unknown extension for file '{}'", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },
}

// ── Upload errors ─────────────────────────────────────────────────────────────

/// Fact upload failures. Never fatal inside the worker pool.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(
        "{certname}: During the fact upload the server responded with: {status} {reason}. Error is ignored and the execution continues."
    )]
    Rejected {
        certname: String,
        status: u16,
        reason: String,
    },

    #[error("Could not send facts to Foreman: {0}")]
    Transport(String),

    #[error("Could not send facts to Foreman: {0}")]
    FactFile(#[from] FactFileError),

    #[error("Could not send facts to Foreman: cannot record upload of {certname}: {source}")]
    Marker {
        certname: String,
        #[source]
        source: std::io::Error,
    },
}

// ── Classification errors ─────────────────────────────────────────────────────

/// Classification fetch failures. They trigger the cache fallback.
#[derive(Debug, Error)]
pub enum NodeRetrievalError {
    #[error(
        "Error retrieving node {certname}: {status} {reason}\nCheck Foreman's /var/log/foreman/production.log for more information."
    )]
    Status {
        certname: String,
        status: u16,
        reason: String,
    },

    #[error("Error retrieving node {certname}: {message}")]
    Transport { certname: String, message: String },
}

/// The fallback read itself failed; nothing is left to serve.
#[derive(Debug, Error)]
#[error("Unable to read from Cache file: {source}")]
pub struct CacheReadError {
    pub key: String,
    #[source]
    pub source: std::io::Error,
}

// ── Watch errors ──────────────────────────────────────────────────────────────

/// Filesystem watch failures.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(
        "Looks like your inotify watch limit is {limit} but you are asking to watch at least {files} fact files.\nIncrease the watch limit via the system tunable fs.inotify.max_user_watches, exiting."
    )]
    LimitExceeded { limit: usize, files: usize },

    #[error("Watching fact files needs inotify, which is not available on this platform")]
    Unsupported,

    #[error("inotify {action} failed: {message}")]
    Backend {
        action: &'static str,
        message: String,
    },
}

impl WatchError {
    /// Process exit status for this failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            WatchError::LimitExceeded { .. } | WatchError::Unsupported => 2,
            WatchError::Backend { .. } => 1,
        }
    }
}

// ── Report errors ─────────────────────────────────────────────────────────────

/// Report delivery failed after every allowed attempt.
#[derive(Debug, Error)]
#[error("Could not send report to Foreman at {url}: {message}")]
pub struct ReportDeliveryError {
    pub url: String,
    pub message: String,
}
