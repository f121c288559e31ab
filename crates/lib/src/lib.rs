//! bslua-lib: Core types and logic for bslua
//!
//! This crate provides everything the `bs` tool needs to turn Lua build
//! descriptions into compiler invocations:
//! - `Variant` and `Settings`: what to build and where outputs go
//! - `Target`: declared libraries and applications
//! - `Compiler`: incremental compile, archive and link driven by timestamps
//! - `eval`/`dispatch`: loading description files and running named actions

pub mod compiler;
pub mod consts;
pub mod deps;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod eval;
pub mod exec;
pub mod handlers;
pub mod lua;
pub mod platform;
pub mod session;
pub mod settings;
pub mod target;
pub mod template;
pub mod variant;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::BuildError;
