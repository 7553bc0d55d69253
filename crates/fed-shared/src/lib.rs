//! Shared-dependency registry for the fedhost toolkit.
//!
//! Host and remotes agree on which runtime libraries are de-duplicated
//! across module boundaries. This crate provides:
//! - `SharedRegistry` - the per-page registry of pinned instances
//! - `SharedInstance` - a concrete, reference-counted library instance
//! - `SharedError` - the version-conflict taxonomy

mod error;
mod registry;

pub use error::*;
pub use registry::*;
