//! Remote references and URL parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;

/// A reference to a remote: the remote's own federation name plus the URL
/// where its entry manifest is served.
///
/// The wire form is `<name>@<url>`, e.g.
/// `usersApp@http://localhost:3001/remoteEntry.js`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteRef {
    /// The remote's declared federation name.
    pub name: String,
    /// URL of the remote's entry manifest.
    pub url: String,
}

impl RemoteRef {
    /// Create a remote reference from its parts.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Parse the `<name>@<url>` wire form.
    pub fn parse(s: &str) -> Result<Self, DescriptorError> {
        let (name, url) = s
            .split_once('@')
            .ok_or_else(|| DescriptorError::InvalidRemoteRef(s.to_string()))?;

        if name.is_empty() || !is_identifier(name) {
            return Err(DescriptorError::InvalidRemoteRef(s.to_string()));
        }

        // Reject URLs that don't parse at all; reachability is a runtime concern.
        EntryUrl::parse(url)?;

        Ok(Self::new(name, url))
    }

    /// Parsed view of the entry URL.
    pub fn entry_url(&self) -> Result<EntryUrl, DescriptorError> {
        EntryUrl::parse(&self.url)
    }
}

impl fmt::Display for RemoteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.url)
    }
}

impl FromStr for RemoteRef {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RemoteRef {
    type Error = DescriptorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<RemoteRef> for String {
    fn from(r: RemoteRef) -> String {
        r.to_string()
    }
}

/// Minimal parsed entry URL: scheme, host, port, path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryUrl {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl EntryUrl {
    /// Parse a URL of the form `scheme://host[:port][/path]`.
    pub fn parse(url: &str) -> Result<Self, DescriptorError> {
        let (scheme, rest) = url.split_once("://").ok_or_else(|| DescriptorError::InvalidUrl {
            url: url.to_string(),
            reason: "missing scheme".to_string(),
        })?;

        let (authority, path) = match rest.split_once('/') {
            Some((a, p)) => (a, format!("/{}", p)),
            None => (rest, "/".to_string()),
        };

        if authority.is_empty() {
            return Err(DescriptorError::InvalidUrl {
                url: url.to_string(),
                reason: "missing host".to_string(),
            });
        }

        let (host, port) = if let Some((h, p)) = authority.rsplit_once(':') {
            if h.is_empty() {
                return Err(DescriptorError::InvalidUrl {
                    url: url.to_string(),
                    reason: "missing host".to_string(),
                });
            }
            let port = p.parse().map_err(|_| DescriptorError::InvalidUrl {
                url: url.to_string(),
                reason: format!("invalid port '{}'", p),
            })?;
            (h.to_string(), port)
        } else {
            (authority.to_string(), default_port(scheme))
        };

        Ok(Self {
            scheme: scheme.to_string(),
            host,
            port,
            path,
        })
    }

    /// Whether the URL points at localhost/loopback.
    pub fn is_localhost(&self) -> bool {
        self.host == "localhost" || self.host == "::1" || self.host.starts_with("127.")
    }
}

fn default_port(scheme: &str) -> u16 {
    match scheme.to_lowercase().as_str() {
        "http" => 80,
        _ => 443,
    }
}

/// Check that a string is a valid federation identifier.
///
/// Aliases end up as the prefix of dynamic import specifiers, so the rule
/// follows identifier syntax: leading letter, `_` or `$`, then letters,
/// digits, `_` or `$`.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
