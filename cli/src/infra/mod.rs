//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: settings and fact files,
//! the ENC cache, HTTP to Foreman, inotify, and process identity.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` are forbidden.

pub mod cache;
pub mod config;
pub mod facts;
pub mod http;
pub mod identity;
pub mod inotify;
pub mod privileges;
pub mod tls;
