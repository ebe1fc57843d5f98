//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod enc;
pub mod error;
pub mod facts;
pub mod watch;

pub use config::{FactExtension, Settings, TlsSettings};
pub use error::{
    CacheReadError, ConfigError, FactFileError, NodeRetrievalError, ReportDeliveryError,
    UploadError, WatchError,
};
pub use watch::{RoutedEvent, WatchEvent, WatchTable};
