//! CLI integration tests.
//!
//! Builds run in dry-run mode, so no C compiler is needed.

mod action_tests;
mod build_tests;
mod common;
