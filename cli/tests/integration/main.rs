//! Integration tests for foreman-enc
//!
//! These tests spawn the actual binary against temp puppet directories and
//! local HTTP stubs. They are slower and should be run separately from unit
//! tests.

mod cli_tests;
