//! Error types for descriptor handling.

use thiserror::Error;

/// Errors from parsing, loading, or saving a federation descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// A remote reference string was not of the form `<name>@<url>`.
    #[error("invalid remote reference '{0}': expected <name>@<url>")]
    InvalidRemoteRef(String),

    /// A remote URL could not be parsed.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Descriptor file could not be read or written.
    #[error("failed to access descriptor file '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Descriptor file could not be parsed.
    #[error("failed to parse descriptor '{path}': {message}")]
    Parse { path: String, message: String },

    /// Descriptor file could not be serialized.
    #[error("failed to serialize descriptor: {0}")]
    Serialize(String),

    /// Unsupported descriptor file extension.
    #[error("unsupported descriptor format '{0}': expected .toml or .json")]
    UnsupportedFormat(String),

    /// Structural validation failed.
    #[error("descriptor validation failed with {0} error(s)")]
    Invalid(usize),
}
