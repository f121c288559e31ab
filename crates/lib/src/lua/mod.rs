//! Lua runtime and the description-file API.
//!
//! Build descriptions are Lua scripts sharing one global namespace. The `bs`
//! global table declares targets, settings and external projects and gives
//! access to the build actions.
//!
//! # Submodules
//!
//! - [`convert`] - Lua values to inputs, string lists and settings
//! - [`globals`] - The `bs` table (`bs.library{}`, `bs.application{}`, etc.)
//! - [`handles`] - Userdata handles for targets, settings and autoconf projects
//! - [`loaders`] - Description file loading with per-file `__dir`/`__file`
//! - [`runtime`] - Low-level Lua VM setup

pub mod convert;
pub mod globals;
pub mod handles;
pub mod loaders;
pub mod runtime;
