//! Dependency tracking.
//!
//! - [`cache`] persists the dependency list of every object, one JSON file
//!   per build directory, so unchanged sources are not rescanned.
//! - [`checker`] decides staleness from file modification times.
//! - [`scan`] parses the Makefile rules emitted by `cc -M`.

pub mod cache;
pub mod checker;
pub mod scan;

pub use cache::{CacheEntry, CacheError, DependencyCache};
pub use checker::TimestampChecker;
pub use scan::{MakeRule, ScanError, parse_rule};
