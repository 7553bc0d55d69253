//! The federation loader: fetch, cache, reconcile, resolve.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use fed_core::{HostDescriptor, RemoteEntry};
use fed_shared::{SharedError, SharedRegistry};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::fetcher::{FetchError, RemoteFetcher};
use crate::observe::{LoadObserver, LoadPhase};
use crate::policy::FetchPolicy;

/// Error type for remote loading.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    /// The alias is not declared in the host descriptor.
    #[error("unknown remote alias '{0}'")]
    UnknownAlias(String),

    /// The remote's entry URL could not be fetched.
    #[error("remote '{alias}' unreachable at {url}")]
    Unreachable {
        alias: String,
        url: String,
        #[source]
        source: FetchError,
    },

    /// The remote served something that is not an entry manifest.
    #[error("remote '{alias}' served an invalid entry manifest: {reason}")]
    Manifest { alias: String, reason: String },

    /// The manifest's declared name does not match the descriptor's.
    #[error("remote '{alias}' declares name '{served}', descriptor says '{declared}'")]
    NameMismatch {
        alias: String,
        declared: String,
        served: String,
    },

    /// The requested export is not in the remote's manifest.
    #[error("remote '{alias}' does not expose '{export}'")]
    MissingExport { alias: String, export: String },

    /// Shared-dependency reconciliation failed for this remote.
    #[error("shared dependency error for remote '{alias}'")]
    Shared {
        alias: String,
        #[source]
        source: SharedError,
    },
}

/// A successfully resolved module binding.
///
/// The loader exposes only success or failure; this handle is what callers
/// hand to their import machinery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedModule {
    /// Alias the module was requested under.
    pub alias: String,
    /// The remote's declared federation name.
    pub remote_name: String,
    /// The resolved public export path.
    pub export: String,
    /// Entry URL the module was loaded from.
    pub url: String,
}

/// Outcome of warming up all declared remotes.
#[derive(Debug, Default)]
pub struct WarmUpReport {
    /// Aliases whose entry manifests loaded.
    pub loaded: Vec<String>,
    /// Aliases that failed, with their isolated failures.
    pub failed: Vec<(String, LoadError)>,
}

impl WarmUpReport {
    /// Whether every declared remote loaded.
    pub fn all_loaded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Per-alias cache slot. The per-alias lock serializes concurrent fetches of
/// the same alias; distinct aliases never contend.
type Slot = Arc<tokio::sync::Mutex<Option<Arc<RemoteEntry>>>>;

/// Runtime loader over a host descriptor.
///
/// A remote's entry manifest is fetched at most once per loader lifetime;
/// failures are not cached, so a later request for a failed alias fetches
/// again. One alias failing never affects another.
pub struct FederationLoader {
    descriptor: Arc<HostDescriptor>,
    fetcher: Arc<dyn RemoteFetcher>,
    registry: SharedRegistry,
    policy: FetchPolicy,
    observers: Vec<Arc<dyn LoadObserver>>,
    slots: Mutex<HashMap<String, Slot>>,
    started: Instant,
}

impl FederationLoader {
    /// Create a loader over a descriptor.
    ///
    /// The host's own shared requirements are registered immediately.
    pub fn new(descriptor: HostDescriptor, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        let registry = SharedRegistry::new();
        registry.register_all(&descriptor.name, &descriptor.shared);
        Self {
            descriptor: Arc::new(descriptor),
            fetcher,
            registry,
            policy: FetchPolicy::default(),
            observers: Vec::new(),
            slots: Mutex::new(HashMap::new()),
            started: Instant::now(),
        }
    }

    /// Use an existing shared registry instead of a fresh one.
    pub fn with_registry(mut self, registry: SharedRegistry) -> Self {
        registry.register_all(&self.descriptor.name, &self.descriptor.shared);
        self.registry = registry;
        self
    }

    /// Set the fetch policy.
    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Attach a lifecycle observer.
    pub fn with_observer(mut self, observer: Arc<dyn LoadObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// The descriptor this loader serves.
    pub fn descriptor(&self) -> &HostDescriptor {
        &self.descriptor
    }

    /// The shared-dependency registry.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Resolve an export of a remote, fetching its entry manifest if needed.
    ///
    /// Fetch, cache, and shared-version reconciliation are internal; callers
    /// see only the resolved binding or the failure.
    pub async fn resolve(&self, alias: &str, export: &str) -> Result<ResolvedModule, LoadError> {
        let url = self
            .descriptor
            .remote(alias)
            .ok_or_else(|| LoadError::UnknownAlias(alias.to_string()))?
            .url
            .clone();
        let entry = self.load_entry(alias).await?;

        if !entry.has_export(export) {
            let err = LoadError::MissingExport {
                alias: alias.to_string(),
                export: export.to_string(),
            };
            self.notify(alias, LoadPhase::Failed(err.to_string()));
            return Err(err);
        }

        // Reconcile this remote's singleton requests against the registry.
        // A package nobody provided is fine: the remote falls back to its
        // own copy. A pinned instance outside the range is not.
        for (package, spec) in &entry.shared {
            if !spec.singleton {
                continue;
            }
            match self
                .registry
                .resolve(&entry.name, package, &spec.required_version)
            {
                Ok(instance) => {
                    debug!(alias, package, version = %instance.version, "shared instance bound");
                }
                Err(SharedError::NotProvided { .. }) => {
                    debug!(alias, package, "no shared instance provided, remote uses its own");
                }
                Err(source) => {
                    let err = LoadError::Shared {
                        alias: alias.to_string(),
                        source,
                    };
                    self.notify(alias, LoadPhase::Failed(err.to_string()));
                    return Err(err);
                }
            }
        }

        self.notify(alias, LoadPhase::Resolved(export.to_string()));
        Ok(ResolvedModule {
            alias: alias.to_string(),
            remote_name: entry.name.clone(),
            export: export.to_string(),
            url,
        })
    }

    /// Fetch every declared remote's entry manifest concurrently.
    ///
    /// Failure domains are isolated per alias: each failure is reported
    /// against its own alias and unrelated remotes load to completion.
    pub async fn warm_up(&self) -> WarmUpReport {
        let aliases: Vec<String> = self.descriptor.remotes.keys().cloned().collect();
        let loads = aliases.iter().map(|alias| async move {
            let result = self.load_entry(alias).await;
            (alias.clone(), result)
        });

        let mut report = WarmUpReport::default();
        for (alias, result) in join_all(loads).await {
            match result {
                Ok(_) => report.loaded.push(alias),
                Err(err) => report.failed.push((alias, err)),
            }
        }
        report
    }

    /// Load and cache the entry manifest for one alias.
    pub async fn load_entry(&self, alias: &str) -> Result<Arc<RemoteEntry>, LoadError> {
        let remote = self
            .descriptor
            .remote(alias)
            .ok_or_else(|| LoadError::UnknownAlias(alias.to_string()))?
            .clone();

        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(slots.entry(alias.to_string()).or_default())
        };

        let mut guard = slot.lock().await;
        if let Some(entry) = guard.as_ref() {
            return Ok(Arc::clone(entry));
        }

        self.notify(alias, LoadPhase::FetchStart);
        let entry = match self.fetch_with_retry(&remote.url).await {
            Ok(entry) => entry,
            Err(FetchError::Deserialization(reason)) => {
                let err = LoadError::Manifest {
                    alias: alias.to_string(),
                    reason,
                };
                warn!(alias, %err, "entry load failed");
                self.notify(alias, LoadPhase::Failed(err.to_string()));
                return Err(err);
            }
            Err(source) => {
                let err = LoadError::Unreachable {
                    alias: alias.to_string(),
                    url: remote.url.clone(),
                    source,
                };
                warn!(alias, %err, "entry load failed");
                self.notify(alias, LoadPhase::Failed(err.to_string()));
                return Err(err);
            }
        };

        if entry.name != remote.name {
            let err = LoadError::NameMismatch {
                alias: alias.to_string(),
                declared: remote.name.clone(),
                served: entry.name.clone(),
            };
            warn!(alias, %err, "entry load failed");
            self.notify(alias, LoadPhase::Failed(err.to_string()));
            return Err(err);
        }

        self.registry.register_all(&entry.name, &entry.shared);

        let entry = Arc::new(entry);
        *guard = Some(Arc::clone(&entry));
        debug!(alias, remote = %entry.name, exports = entry.exposes.len(), "entry manifest loaded");
        self.notify(alias, LoadPhase::EntryLoaded);
        Ok(entry)
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<RemoteEntry, FetchError> {
        let mut attempt = 0;
        loop {
            let outcome =
                tokio::time::timeout(self.policy.timeout.total, self.fetcher.fetch_entry(url))
                    .await;
            let err = match outcome {
                Ok(Ok(entry)) => return Ok(entry),
                Ok(Err(e)) => e,
                Err(_) => FetchError::Timeout(url.to_string()),
            };

            if !self.policy.retry.should_retry(&err, attempt) {
                return Err(err);
            }

            let delay = self.policy.retry.backoff.delay_for_attempt(attempt);
            debug!(url, attempt, ?delay, %err, "retrying entry fetch");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn notify(&self, alias: &str, phase: LoadPhase) {
        let elapsed = self.started.elapsed();
        for observer in &self.observers {
            observer.on_phase(alias, phase.clone(), elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use fed_core::{RemoteRef, SharedSpec};
    use semver::Version;

    use super::*;
    use crate::fetcher::StaticFetcher;
    use crate::observe::{LoadObserver, LoadTiming};
    use crate::policy::{RetryPolicy, TimeoutConfig};

    const USERS_URL: &str = "http://localhost:3001/remoteEntry.js";
    const EDIT_URL: &str = "http://localhost:3002/remoteEntry.js";

    fn shell_descriptor() -> HostDescriptor {
        HostDescriptor::new("shell", "remoteEntry.js")
            .with_remote("usersApp", RemoteRef::new("usersApp", USERS_URL))
            .with_remote("editUserApp", RemoteRef::new("editUserApp", EDIT_URL))
            .with_expose("./store", "./src/store/index.js")
            .with_shared("vue", SharedSpec::singleton("^2.6.14").unwrap())
    }

    fn users_entry() -> RemoteEntry {
        RemoteEntry::new("usersApp")
            .with_expose("./UserList")
            .with_shared("vue", SharedSpec::singleton("^2.6.0").unwrap())
    }

    fn edit_entry() -> RemoteEntry {
        RemoteEntry::new("editUserApp").with_expose("./EditUser")
    }

    fn loader_with(fetcher: StaticFetcher) -> (FederationLoader, Arc<StaticFetcher>) {
        let fetcher = Arc::new(fetcher);
        let loader = FederationLoader::new(shell_descriptor(), fetcher.clone());
        (loader, fetcher)
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let (loader, _) = loader_with(
            StaticFetcher::new()
                .with_entry(USERS_URL, users_entry())
                .with_entry(EDIT_URL, edit_entry()),
        );
        loader.registry().provide("vue", Version::new(2, 6, 14)).unwrap();

        let module = loader.resolve("usersApp", "./UserList").await.unwrap();
        assert_eq!(module.remote_name, "usersApp");
        assert_eq!(module.export, "./UserList");
        assert_eq!(module.url, USERS_URL);
    }

    #[tokio::test]
    async fn test_entry_fetched_at_most_once() {
        let (loader, fetcher) = loader_with(StaticFetcher::new().with_entry(USERS_URL, users_entry()));
        loader.registry().provide("vue", Version::new(2, 6, 14)).unwrap();

        loader.resolve("usersApp", "./UserList").await.unwrap();
        loader.resolve("usersApp", "./UserList").await.unwrap();
        assert_eq!(fetcher.fetch_count(USERS_URL), 1);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_fetch() {
        let (loader, fetcher) = loader_with(StaticFetcher::new().with_entry(USERS_URL, users_entry()));
        loader.registry().provide("vue", Version::new(2, 6, 14)).unwrap();

        let (a, b) = tokio::join!(
            loader.resolve("usersApp", "./UserList"),
            loader.resolve("usersApp", "./UserList"),
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(fetcher.fetch_count(USERS_URL), 1);
    }

    #[tokio::test]
    async fn test_unknown_alias() {
        let (loader, _) = loader_with(StaticFetcher::new());
        let err = loader.resolve("checkoutApp", "./Cart").await.unwrap_err();
        assert!(matches!(err, LoadError::UnknownAlias(_)));
    }

    #[tokio::test]
    async fn test_missing_export() {
        let (loader, _) = loader_with(StaticFetcher::new().with_entry(USERS_URL, users_entry()));
        loader.registry().provide("vue", Version::new(2, 6, 14)).unwrap();

        let err = loader.resolve("usersApp", "./Nope").await.unwrap_err();
        assert!(matches!(err, LoadError::MissingExport { .. }));
    }

    #[tokio::test]
    async fn test_name_mismatch_rejected() {
        let (loader, _) = loader_with(
            StaticFetcher::new().with_entry(USERS_URL, RemoteEntry::new("somethingElse")),
        );
        let err = loader.load_entry("usersApp").await.unwrap_err();
        assert!(matches!(err, LoadError::NameMismatch { .. }));
    }

    #[tokio::test]
    async fn test_warm_up_isolates_failures() {
        let (loader, _) = loader_with(
            StaticFetcher::new()
                .with_entry(USERS_URL, users_entry())
                .with_failure(
                    EDIT_URL,
                    FetchError::Http {
                        status: 404,
                        url: EDIT_URL.to_string(),
                    },
                ),
        );

        let report = loader.warm_up().await;
        assert_eq!(report.loaded, vec!["usersApp".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "editUserApp");
        assert!(!report.all_loaded());
    }

    #[tokio::test]
    async fn test_failed_load_is_not_pinned() {
        let fetcher = Arc::new(StaticFetcher::new().with_failure(
            USERS_URL,
            FetchError::Connection("refused".to_string()),
        ));
        // No retries, so every fetch the counter sees is one load_entry call.
        let loader = FederationLoader::new(shell_descriptor(), fetcher.clone())
            .with_policy(FetchPolicy::new(TimeoutConfig::default(), RetryPolicy::none()));

        assert!(loader.load_entry("usersApp").await.is_err());
        assert!(loader.load_entry("usersApp").await.is_err());
        // Two attempts reached the fetcher: the failure was not cached.
        assert_eq!(fetcher.fetch_count(USERS_URL), 2);
    }

    #[tokio::test]
    async fn test_singleton_conflict_surfaces_as_load_error() {
        let conflicting = RemoteEntry::new("usersApp")
            .with_expose("./UserList")
            .with_shared("vue", SharedSpec::singleton("^3.0.0").unwrap());
        let (loader, _) = loader_with(StaticFetcher::new().with_entry(USERS_URL, conflicting));
        loader.registry().provide("vue", Version::new(2, 6, 14)).unwrap();

        let err = loader.resolve("usersApp", "./UserList").await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::Shared {
                source: SharedError::VersionConflict { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_remote_without_provided_shared_loads() {
        // Nothing provided for vue: the remote falls back to its own copy.
        let (loader, _) = loader_with(StaticFetcher::new().with_entry(USERS_URL, users_entry()));
        loader.resolve("usersApp", "./UserList").await.unwrap();
    }

    #[tokio::test]
    async fn test_observer_sees_phases() {
        struct Counter(AtomicUsize);
        impl LoadObserver for Counter {
            fn on_phase(&self, _alias: &str, phase: LoadPhase, _elapsed: std::time::Duration) {
                if matches!(phase, LoadPhase::EntryLoaded | LoadPhase::Resolved(_)) {
                    self.0.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let fetcher = Arc::new(StaticFetcher::new().with_entry(USERS_URL, users_entry()));
        let loader = FederationLoader::new(shell_descriptor(), fetcher)
            .with_observer(counter.clone());
        loader.registry().provide("vue", Version::new(2, 6, 14)).unwrap();

        loader.resolve("usersApp", "./UserList").await.unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timing_observer_records_marks() {
        let timing = Arc::new(LoadTiming::new());
        let fetcher = Arc::new(StaticFetcher::new().with_entry(USERS_URL, users_entry()));
        let loader = FederationLoader::new(shell_descriptor(), fetcher)
            .with_observer(timing.clone());
        loader.registry().provide("vue", Version::new(2, 6, 14)).unwrap();

        loader.resolve("usersApp", "./UserList").await.unwrap();

        assert!(timing.time_to("usersApp_loaded").is_some());
        assert!(timing.time_to("usersApp_resolved").is_some());
        assert!(timing.time_to_first_entry().is_some());
        assert!(timing.time_to("editUserApp_loaded").is_none());
    }
}
