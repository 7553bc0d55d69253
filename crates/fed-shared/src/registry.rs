//! Runtime registry of shared-dependency instances.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use fed_core::SharedSpec;
use semver::{Version, VersionReq};
use tracing::{debug, warn};

use crate::error::SharedError;

/// A concrete, reference-counted library instance.
///
/// Referential identity is the point: two participants that resolve the same
/// singleton package receive clones of the same `Arc`.
#[derive(Debug)]
pub struct SharedInstance {
    /// Package name.
    pub package: String,
    /// Concrete version of this instance.
    pub version: Version,
}

impl SharedInstance {
    /// Whether two handles refer to the same instance.
    pub fn same_instance(a: &Arc<SharedInstance>, b: &Arc<SharedInstance>) -> bool {
        Arc::ptr_eq(a, b)
    }
}

/// A participant's recorded requirement for a package.
#[derive(Debug, Clone)]
struct Requirement {
    participant: String,
    requirement: VersionReq,
}

#[derive(Debug, Default)]
struct PackageState {
    singleton: bool,
    requirements: Vec<Requirement>,
    /// The chosen instance for a singleton package.
    pinned: Option<Arc<SharedInstance>>,
    /// All live instances (one entry for a pinned singleton).
    instances: Vec<Arc<SharedInstance>>,
    /// Every version ever offered, including de-duplicated offers.
    offered: Vec<Version>,
}

/// Registry of shared dependencies, scoped to one page/session lifetime.
///
/// Handles are cheap to clone and share one underlying registry. The
/// registry lives from creation to drop; nothing persists beyond that.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<BTreeMap<String, PackageState>>>,
}

impl SharedRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one participant's requirement for a package.
    ///
    /// A package becomes a singleton as soon as any participant declares it
    /// as one.
    pub fn register(&self, participant: &str, package: &str, spec: &SharedSpec) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let state = inner.entry(package.to_string()).or_default();
        state.singleton |= spec.singleton;
        state.requirements.push(Requirement {
            participant: participant.to_string(),
            requirement: spec.required_version.clone(),
        });
        debug!(participant, package, %spec.required_version, singleton = spec.singleton, "registered shared requirement");
    }

    /// Record all of a participant's shared requirements.
    pub fn register_all(&self, participant: &str, shared: &BTreeMap<String, SharedSpec>) {
        for (package, spec) in shared {
            self.register(participant, package, spec);
        }
    }

    /// Offer a concrete instance of a package.
    ///
    /// For a singleton package the first satisfying offer is pinned; later
    /// offers are de-duplicated to the pinned instance. An offer that
    /// violates an already-registered range is refused.
    pub fn provide(&self, package: &str, version: Version) -> Result<Arc<SharedInstance>, SharedError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let state = inner.entry(package.to_string()).or_default();
        state.offered.push(version.clone());

        if state.singleton {
            if let Some(pinned) = &state.pinned {
                debug!(package, offered = %version, pinned = %pinned.version, "de-duplicated shared offer");
                return Ok(Arc::clone(pinned));
            }

            if let Some(unmet) = state
                .requirements
                .iter()
                .find(|r| !r.requirement.matches(&version))
            {
                warn!(package, offered = %version, requirement = %unmet.requirement, "refusing offer that violates a registered range");
                return Err(SharedError::Unsatisfied {
                    package: package.to_string(),
                    requirement: unmet.requirement.clone(),
                    participant: unmet.participant.clone(),
                });
            }

            let instance = Arc::new(SharedInstance {
                package: package.to_string(),
                version,
            });
            debug!(package, version = %instance.version, "pinned singleton instance");
            state.pinned = Some(Arc::clone(&instance));
            state.instances.push(Arc::clone(&instance));
            return Ok(instance);
        }

        let instance = Arc::new(SharedInstance {
            package: package.to_string(),
            version,
        });
        state.instances.push(Arc::clone(&instance));
        Ok(instance)
    }

    /// Resolve a participant's request for a package.
    ///
    /// For a singleton package the pinned instance is returned only when it
    /// satisfies the requirement; a pinned instance outside the range is a
    /// loud `VersionConflict`, never a silent reuse.
    pub fn resolve(
        &self,
        participant: &str,
        package: &str,
        requirement: &VersionReq,
    ) -> Result<Arc<SharedInstance>, SharedError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let state = match inner.get(package) {
            Some(s) => s,
            None => {
                return Err(SharedError::NotProvided {
                    package: package.to_string(),
                })
            }
        };

        if state.singleton {
            let pinned = state.pinned.as_ref().ok_or_else(|| SharedError::NotProvided {
                package: package.to_string(),
            })?;
            if requirement.matches(&pinned.version) {
                return Ok(Arc::clone(pinned));
            }
            warn!(participant, package, pinned = %pinned.version, %requirement, "singleton version conflict");
            return Err(SharedError::VersionConflict {
                package: package.to_string(),
                pinned: pinned.version.clone(),
                requirement: requirement.clone(),
                participant: participant.to_string(),
            });
        }

        if state.instances.is_empty() {
            return Err(SharedError::NotProvided {
                package: package.to_string(),
            });
        }

        state
            .instances
            .iter()
            .find(|i| requirement.matches(&i.version))
            .cloned()
            .ok_or_else(|| SharedError::Unsatisfied {
                package: package.to_string(),
                requirement: requirement.clone(),
                participant: participant.to_string(),
            })
    }

    /// Check every singleton package for a version that satisfies all
    /// registered ranges among the offered candidates.
    ///
    /// Packages with requirements but no offers yet are skipped; they fail
    /// later at `resolve` with `NotProvided`.
    pub fn reconcile(&self) -> Result<(), Vec<SharedError>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut conflicts = Vec::new();

        for (package, state) in inner.iter() {
            if !state.singleton || state.offered.is_empty() {
                continue;
            }
            let satisfiable = state.offered.iter().any(|v| {
                state.requirements.iter().all(|r| r.requirement.matches(v))
            });
            if !satisfiable {
                conflicts.push(SharedError::Irreconcilable {
                    package: package.clone(),
                });
            }
        }

        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(conflicts)
        }
    }

    /// The pinned version of a singleton package, if any.
    pub fn pinned_version(&self, package: &str) -> Option<Version> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .get(package)
            .and_then(|s| s.pinned.as_ref())
            .map(|i| i.version.clone())
    }
}
