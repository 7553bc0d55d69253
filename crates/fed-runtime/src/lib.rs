//! Remote loading runtime for the fedhost toolkit.
//!
//! The build-time descriptor declares which remotes exist; this crate does
//! the runtime half:
//! - `RemoteFetcher` - how entry manifests are fetched
//! - `FetchPolicy` - timeout and retry behavior per fetch
//! - `FederationLoader` - fetch, cache, reconcile, resolve
//! - `LoadObserver` - lifecycle hooks for observability

mod fetcher;
mod loader;
mod observe;
mod policy;

pub use fetcher::*;
pub use loader::*;
pub use observe::*;
pub use policy::*;
