//! Demo shell host.
//!
//! Stands in for the runtime half of a federated shell application: loads
//! the descriptor, warms up both remotes from in-memory fixtures, resolves
//! an export from each, then serves the shell's own entry manifest locally.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use fed_core::{HostDescriptor, RemoteEntry, SharedSpec};
use fed_devserver::DevServer;
use fed_runtime::{FederationLoader, LoadTiming, StaticFetcher};
use semver::Version;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let descriptor = HostDescriptor::load(manifest_dir.join("federation.toml"))
        .context("failed to load federation.toml")?;
    info!(host = %descriptor.name, remotes = descriptor.remotes.len(), "descriptor loaded");

    // In-memory stand-ins for the two remote dev servers.
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_entry(
                "http://localhost:3001/remoteEntry.js",
                RemoteEntry::new("usersApp")
                    .with_version(Version::new(1, 0, 0))
                    .with_expose("./UserList")
                    .with_shared("vue", SharedSpec::singleton("^2.6.0")?),
            )
            .with_entry(
                "http://localhost:3002/remoteEntry.js",
                RemoteEntry::new("editUserApp")
                    .with_version(Version::new(1, 0, 0))
                    .with_expose("./EditUser")
                    .with_shared("vue", SharedSpec::singleton("^2.6.10")?),
            ),
    );

    let timing = Arc::new(LoadTiming::new());
    let loader = FederationLoader::new(descriptor.clone(), fetcher).with_observer(timing.clone());

    // The shell provides the singletons it bundles.
    loader.registry().provide("vue", Version::new(2, 6, 14))?;
    loader.registry().provide("vue-i18n", Version::new(8, 28, 2))?;

    let report = loader.warm_up().await;
    for alias in &report.loaded {
        info!(alias, "remote warmed up");
    }
    for (alias, err) in &report.failed {
        warn!(alias, %err, "remote failed to warm up");
    }
    if let Some(first) = timing.time_to_first_entry() {
        info!(?first, "first entry manifest loaded");
    }

    let users = loader.resolve("usersApp", "./UserList").await?;
    info!(alias = %users.alias, export = %users.export, "resolved");
    let edit = loader.resolve("editUserApp", "./EditUser").await?;
    info!(alias = %edit.alias, export = %edit.export, "resolved");

    if let Err(conflicts) = loader.registry().reconcile() {
        for conflict in conflicts {
            warn!(%conflict, "shared reconciliation");
        }
    }

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    DevServer::dev(descriptor)?
        .with_asset_root(manifest_dir)
        .serve(shutdown)
        .await?;
    Ok(())
}
