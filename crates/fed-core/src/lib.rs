//! Core abstractions for the fedhost module-federation toolkit.
//!
//! This crate provides the fundamental types:
//! - `HostDescriptor` - The host's federation configuration
//! - `RemoteRef` - A `<name>@<url>` reference to a remote
//! - `SharedSpec` - Shared-dependency constraints
//! - `RemoteEntry` - The entry manifest served/consumed at runtime

mod descriptor;
mod error;
mod manifest;
mod remote;
mod validate;

pub use descriptor::*;
pub use error::*;
pub use manifest::*;
pub use remote::*;
pub use validate::*;
