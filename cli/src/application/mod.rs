//! Application layer — port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain` and `foreman_common` — never
//! on `crate::infra` or `crate::commands`.

pub mod ports;
pub mod services;

pub use ports::{
    FactSource, FileStat, ForemanApi, FreshnessCache, LocalIdentity, ReportSink, SettingsSource,
    WatchBackend,
};
