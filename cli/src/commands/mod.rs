//! Command implementations

pub mod enc;
pub mod push;
pub mod report;
