//! Entry manifest wire format.
//!
//! A federation participant serves this document at its entry URL. The
//! consuming side resolves exposed paths against it and reconciles shared
//! dependencies before binding any module.

use std::collections::BTreeMap;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::descriptor::{HostDescriptor, SharedSpec};

/// The entry manifest a participant serves at its entry URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// The participant's federation name.
    pub name: String,
    /// Build version of the participant, if it publishes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// Public export paths this participant offers.
    #[serde(default)]
    pub exposes: Vec<String>,
    /// Shared-dependency constraints this participant requests.
    #[serde(default)]
    pub shared: BTreeMap<String, SharedSpec>,
}

impl RemoteEntry {
    /// Create an empty manifest for a participant.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            exposes: Vec::new(),
            shared: BTreeMap::new(),
        }
    }

    /// Set the participant's build version.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Add an exposed path.
    pub fn with_expose(mut self, path: impl Into<String>) -> Self {
        self.exposes.push(path.into());
        self
    }

    /// Add a shared-dependency request.
    pub fn with_shared(mut self, package: impl Into<String>, spec: SharedSpec) -> Self {
        self.shared.insert(package.into(), spec);
        self
    }

    /// Emit the manifest the host itself serves, derived from its descriptor.
    ///
    /// Exposed public paths and shared constraints carry over; local source
    /// paths do not leave the build machine.
    pub fn from_descriptor(descriptor: &HostDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            version: None,
            exposes: descriptor.exposes.keys().cloned().collect(),
            shared: descriptor.shared.clone(),
        }
    }

    /// Whether the manifest exposes the given public path.
    pub fn has_export(&self, path: &str) -> bool {
        self.exposes.iter().any(|e| e == path)
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from the JSON wire form.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
