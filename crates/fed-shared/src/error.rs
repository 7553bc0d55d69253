//! Error types for shared-dependency resolution.

use semver::{Version, VersionReq};
use thiserror::Error;

/// Errors from shared-dependency registration and resolution.
#[derive(Debug, Clone, Error)]
pub enum SharedError {
    /// A pinned singleton instance cannot satisfy a participant's range.
    /// Resolution fails rather than handing out the pinned instance anyway.
    #[error("version conflict for '{package}': pinned {pinned} does not satisfy {requirement} (requested by {participant})")]
    VersionConflict {
        package: String,
        pinned: Version,
        requirement: VersionReq,
        participant: String,
    },

    /// No provided instance satisfies a participant's range.
    #[error("no instance of '{package}' satisfies {requirement} (requested by {participant})")]
    Unsatisfied {
        package: String,
        requirement: VersionReq,
        participant: String,
    },

    /// Nothing has been provided for the package yet.
    #[error("no instance of '{package}' has been provided")]
    NotProvided { package: String },

    /// Registered ranges for a singleton package have no common satisfying
    /// instance among the provided candidates.
    #[error("irreconcilable ranges for singleton '{package}': no provided version satisfies all participants")]
    Irreconcilable { package: String },
}

impl SharedError {
    /// The package the error refers to.
    pub fn package(&self) -> &str {
        match self {
            Self::VersionConflict { package, .. }
            | Self::Unsatisfied { package, .. }
            | Self::NotProvided { package }
            | Self::Irreconcilable { package } => package,
        }
    }
}
