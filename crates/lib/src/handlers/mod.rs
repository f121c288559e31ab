//! Handlers for projects built by an external build system.

pub mod autoconf;

pub use autoconf::{AutoconfProject, AutoconfStep};
