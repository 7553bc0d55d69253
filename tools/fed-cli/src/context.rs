//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use fed_core::HostDescriptor;

use crate::output::Output;

const DESCRIPTOR_NAMES: [&str; 3] = ["federation.toml", ".federation.toml", "federation.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// Path to the descriptor file, if one was given or discovered.
    pub descriptor_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Build the context, discovering the descriptor if none was given.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let descriptor_path = match config_path {
            Some(path) => Some(PathBuf::from(path)),
            None => find_descriptor(&cwd),
        };

        Ok(Self {
            descriptor_path,
            output,
            cwd,
        })
    }

    /// Load the descriptor, failing if none was found.
    pub fn require_descriptor(&self) -> Result<(HostDescriptor, PathBuf)> {
        let Some(path) = &self.descriptor_path else {
            bail!(
                "no federation descriptor found; looked for {} upward from {}",
                DESCRIPTOR_NAMES.join(", "),
                self.cwd.display()
            );
        };
        let descriptor = HostDescriptor::load(path)
            .with_context(|| format!("failed to load descriptor '{}'", path.display()))?;
        Ok((descriptor, path.clone()))
    }

    /// The project root: the directory holding the descriptor, else the cwd.
    pub fn project_root(&self) -> PathBuf {
        self.descriptor_path
            .as_ref()
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cwd.clone())
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }
}

/// Find a descriptor file in the directory tree.
fn find_descriptor(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in &DESCRIPTOR_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_descriptor_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("federation.toml"), "name = \"shell\"\nfilename = \"remoteEntry.js\"\n").unwrap();
        let nested = dir.path().join("src/components");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_descriptor(&nested).unwrap();
        assert_eq!(found, dir.path().join("federation.toml"));
    }

    #[test]
    fn test_find_descriptor_none() {
        let dir = tempfile::tempdir().unwrap();
        // The walk can escape the tempdir; only assert nothing inside matched.
        if let Some(found) = find_descriptor(dir.path()) {
            assert!(!found.starts_with(dir.path()));
        }
    }
}
