//! Host federation descriptor.

use std::collections::BTreeMap;
use std::path::Path;

use semver::VersionReq;
use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;
use crate::remote::RemoteRef;

/// Version constraints for a shared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSpec {
    /// If set, exactly one instance of the package may exist across the
    /// host and all loaded remotes.
    #[serde(default)]
    pub singleton: bool,
    /// Semver range the instance must satisfy.
    pub required_version: VersionReq,
}

impl SharedSpec {
    /// Create a singleton spec from a range string.
    pub fn singleton(range: &str) -> Result<Self, semver::Error> {
        Ok(Self {
            singleton: true,
            required_version: VersionReq::parse(range)?,
        })
    }

    /// Create a non-singleton spec from a range string.
    pub fn versioned(range: &str) -> Result<Self, semver::Error> {
        Ok(Self {
            singleton: false,
            required_version: VersionReq::parse(range)?,
        })
    }
}

/// Cross-origin policy for the development server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorsPolicy {
    /// `Access-Control-Allow-Origin: *`. Local development only; never a
    /// production security boundary.
    Permissive,
    /// Echo only origins in the list.
    AllowOrigins(Vec<String>),
}

impl CorsPolicy {
    /// Header value for a request from `origin`, or `None` to omit the header.
    pub fn allow_origin_value(&self, origin: Option<&str>) -> Option<String> {
        match self {
            Self::Permissive => Some("*".to_string()),
            Self::AllowOrigins(origins) => origin
                .filter(|o| origins.iter().any(|allowed| allowed == o))
                .map(String::from),
        }
    }
}

/// Development server settings for the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevServerConfig {
    /// Local port to listen on.
    pub port: u16,
    /// Cross-origin policy. Remotes on other local ports must be able to
    /// fetch this host's entry manifest.
    #[serde(default = "default_cors")]
    pub cors: CorsPolicy,
}

fn default_cors() -> CorsPolicy {
    CorsPolicy::Permissive
}

impl DevServerConfig {
    /// Create a permissive dev-server config on the given port.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            cors: CorsPolicy::Permissive,
        }
    }
}

/// The host's federation configuration: identity, remotes, exposed modules,
/// and shared-dependency constraints.
///
/// This is the single declarative object the whole toolkit revolves around.
/// It is authored once, validated at build time, and consumed to emit the
/// runtime loading manifest; it has no runtime mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostDescriptor {
    /// Federation name, unique within the federation.
    pub name: String,
    /// Published entry filename. Must stay stable across deploys so remotes'
    /// cached references remain valid.
    pub filename: String,
    /// Logical alias -> remote reference.
    #[serde(default)]
    pub remotes: BTreeMap<String, RemoteRef>,
    /// Public export path (e.g. `./store`) -> local source path.
    #[serde(default)]
    pub exposes: BTreeMap<String, String>,
    /// Package name -> shared-dependency constraints.
    #[serde(default)]
    pub shared: BTreeMap<String, SharedSpec>,
    /// Development server settings, if this host runs one locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_server: Option<DevServerConfig>,
}

impl HostDescriptor {
    /// Create a descriptor with identity only.
    pub fn new(name: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: filename.into(),
            remotes: BTreeMap::new(),
            exposes: BTreeMap::new(),
            shared: BTreeMap::new(),
            dev_server: None,
        }
    }

    /// Declare a remote under an alias.
    pub fn with_remote(mut self, alias: impl Into<String>, remote: RemoteRef) -> Self {
        self.remotes.insert(alias.into(), remote);
        self
    }

    /// Expose a local module under a public path.
    pub fn with_expose(mut self, public: impl Into<String>, local: impl Into<String>) -> Self {
        self.exposes.insert(public.into(), local.into());
        self
    }

    /// Declare a shared dependency.
    pub fn with_shared(mut self, package: impl Into<String>, spec: SharedSpec) -> Self {
        self.shared.insert(package.into(), spec);
        self
    }

    /// Set development server settings.
    pub fn with_dev_server(mut self, dev_server: DevServerConfig) -> Self {
        self.dev_server = Some(dev_server);
        self
    }

    /// Load a descriptor from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DescriptorError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| DescriptorError::Io {
            path: display.clone(),
            source,
        })?;

        match extension(path) {
            Some("json") => serde_json::from_str(&content).map_err(|e| DescriptorError::Parse {
                path: display,
                message: e.to_string(),
            }),
            Some("toml") => toml::from_str(&content).map_err(|e| DescriptorError::Parse {
                path: display,
                message: e.to_string(),
            }),
            _ => Err(DescriptorError::UnsupportedFormat(display)),
        }
    }

    /// Save the descriptor to a `.toml` or `.json` file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DescriptorError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let content = match extension(path) {
            Some("json") => serde_json::to_string_pretty(self)
                .map_err(|e| DescriptorError::Serialize(e.to_string()))?,
            Some("toml") => {
                toml::to_string_pretty(self).map_err(|e| DescriptorError::Serialize(e.to_string()))?
            }
            _ => return Err(DescriptorError::UnsupportedFormat(display)),
        };

        std::fs::write(path, content).map_err(|source| DescriptorError::Io {
            path: display,
            source,
        })
    }

    /// Look up a remote by alias.
    pub fn remote(&self, alias: &str) -> Option<&RemoteRef> {
        self.remotes.get(alias)
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_descriptor() -> HostDescriptor {
        HostDescriptor::new("shell", "remoteEntry.js")
            .with_remote(
                "usersApp",
                RemoteRef::parse("usersApp@http://localhost:3001/remoteEntry.js").unwrap(),
            )
            .with_remote(
                "editUserApp",
                RemoteRef::parse("editUserApp@http://localhost:3002/remoteEntry.js").unwrap(),
            )
            .with_expose("./store", "./src/store/index.js")
            .with_expose("./i18n", "./src/i18n/index.js")
            .with_expose("./eventBus", "./src/utils/eventBus.js")
            .with_expose("./eventHelpers", "./src/utils/eventBus.js")
            .with_shared("vue", SharedSpec::singleton("^2.6.14").unwrap())
            .with_shared("vue-i18n", SharedSpec::singleton("^8.28.2").unwrap())
            .with_dev_server(DevServerConfig::new(3000))
    }

    #[test]
    fn test_toml_round_trip() {
        let d = shell_descriptor();
        let text = toml::to_string_pretty(&d).unwrap();
        let back: HostDescriptor = toml::from_str(&text).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_json_round_trip() {
        let d = shell_descriptor();
        let text = serde_json::to_string_pretty(&d).unwrap();
        let back: HostDescriptor = serde_json::from_str(&text).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_remote_serialized_as_wire_form() {
        let d = shell_descriptor();
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(
            json["remotes"]["usersApp"],
            "usersApp@http://localhost:3001/remoteEntry.js"
        );
    }

    #[test]
    fn test_shared_spec_wire_field_names() {
        let d = shell_descriptor();
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["shared"]["vue"]["singleton"], true);
        assert_eq!(json["shared"]["vue"]["requiredVersion"], "^2.6.14");
    }

    #[test]
    fn test_load_save_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("federation.toml");
        let d = shell_descriptor();
        d.save(&path).unwrap();
        let back = HostDescriptor::load(&path).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("federation.yaml");
        std::fs::write(&path, "name: shell").unwrap();
        assert!(matches!(
            HostDescriptor::load(&path),
            Err(DescriptorError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_bad_remote_string_fails_parse() {
        let text = r#"
name = "shell"
filename = "remoteEntry.js"

[remotes]
usersApp = "no-url-here"
"#;
        assert!(toml::from_str::<HostDescriptor>(text).is_err());
    }

    #[test]
    fn test_cors_policy_values() {
        let permissive = CorsPolicy::Permissive;
        assert_eq!(
            permissive.allow_origin_value(Some("http://localhost:3001")),
            Some("*".to_string())
        );

        let list = CorsPolicy::AllowOrigins(vec!["https://app.example.com".to_string()]);
        assert_eq!(
            list.allow_origin_value(Some("https://app.example.com")),
            Some("https://app.example.com".to_string())
        );
        assert_eq!(list.allow_origin_value(Some("https://evil.example.com")), None);
        assert_eq!(list.allow_origin_value(None), None);
    }
}
