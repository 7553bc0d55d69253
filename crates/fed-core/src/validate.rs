//! Structural validation of a host descriptor.

use std::path::Path;

use semver::VersionReq;
use serde::Serialize;

use crate::descriptor::HostDescriptor;
use crate::error::DescriptorError;
use crate::remote::is_identifier;

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single validation finding.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    /// Severity of the finding.
    pub severity: Severity,
    /// The descriptor field the finding refers to.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    /// Create an error-severity finding.
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a warning-severity finding.
    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this finding is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// All findings from a validation pass.
///
/// Validation never stops at the first problem; the CLI renders the whole
/// report at once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Number of error-severity findings.
    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_error()).count()
    }

    /// Number of warning-severity findings.
    pub fn warning_count(&self) -> usize {
        self.issues.len() - self.error_count()
    }

    /// Whether the report contains no errors (warnings allowed).
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    /// Append an issue to the report.
    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }
}

impl HostDescriptor {
    /// Run structural validation over the descriptor.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if !is_identifier(&self.name) {
            report.push(ValidationIssue::error(
                "name",
                format!("'{}' is not a valid federation identifier", self.name),
            ));
        }

        if self.filename.is_empty() {
            report.push(ValidationIssue::error("filename", "entry filename is empty"));
        } else if self.filename.contains('/') {
            report.push(ValidationIssue::error(
                "filename",
                format!("entry filename '{}' must not contain '/'", self.filename),
            ));
        }

        for (alias, remote) in &self.remotes {
            let field = format!("remotes.{}", alias);

            if !is_identifier(alias) {
                report.push(ValidationIssue::error(
                    &field,
                    format!("alias '{}' is not a valid federation identifier", alias),
                ));
            }
            if alias == &self.name {
                report.push(ValidationIssue::error(
                    &field,
                    format!("alias '{}' collides with the host's own name", alias),
                ));
            }

            match remote.entry_url() {
                Ok(url) => {
                    if url.scheme != "http" && url.scheme != "https" {
                        report.push(ValidationIssue::error(
                            &field,
                            format!("unsupported scheme '{}'", url.scheme),
                        ));
                    } else if url.scheme == "http" && !url.is_localhost() {
                        report.push(ValidationIssue::warning(
                            &field,
                            format!("plain http to non-local host '{}'", url.host),
                        ));
                    }
                }
                Err(e) => report.push(ValidationIssue::error(&field, e.to_string())),
            }
        }

        for (public, local) in &self.exposes {
            let field = format!("exposes.{}", public);

            if !public.starts_with("./") || public.len() <= 2 {
                report.push(ValidationIssue::error(
                    &field,
                    format!("public path '{}' must start with './' and name a module", public),
                ));
            }
            if local.is_empty() {
                report.push(ValidationIssue::error(&field, "local path is empty"));
            }
        }

        for (package, spec) in &self.shared {
            let field = format!("shared.{}", package);

            if package.is_empty() {
                report.push(ValidationIssue::error(&field, "package name is empty"));
            }
            if spec.singleton && spec.required_version == VersionReq::STAR {
                report.push(ValidationIssue::warning(
                    &field,
                    "singleton with an unconstrained version range",
                ));
            }
        }

        report
    }

    /// Check that every exposed local path resolves to an existing file
    /// under `project_root`.
    pub fn check_exposes(&self, project_root: impl AsRef<Path>) -> ValidationReport {
        let root = project_root.as_ref();
        let mut report = ValidationReport::default();

        for (public, local) in &self.exposes {
            let candidate = root.join(local.trim_start_matches("./"));
            if !candidate.is_file() {
                report.push(ValidationIssue::error(
                    format!("exposes.{}", public),
                    format!("local path '{}' does not exist under {}", local, root.display()),
                ));
            }
        }

        report
    }

    /// Validate structure and expose paths together, failing on any error.
    pub fn ensure_valid(&self, project_root: impl AsRef<Path>) -> Result<ValidationReport, DescriptorError> {
        let mut report = self.validate();
        report.merge(self.check_exposes(project_root));

        if report.is_valid() {
            Ok(report)
        } else {
            Err(DescriptorError::Invalid(report.error_count()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SharedSpec;
    use crate::remote::RemoteRef;

    fn valid_descriptor() -> HostDescriptor {
        HostDescriptor::new("shell", "remoteEntry.js")
            .with_remote(
                "usersApp",
                RemoteRef::new("usersApp", "http://localhost:3001/remoteEntry.js"),
            )
            .with_expose("./store", "./src/store/index.js")
            .with_shared("vue", SharedSpec::singleton("^2.6.14").unwrap())
    }

    #[test]
    fn test_valid_descriptor_is_clean() {
        let report = valid_descriptor().validate();
        assert!(report.is_valid());
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn test_bad_host_name() {
        let mut d = valid_descriptor();
        d.name = "my shell".to_string();
        let report = d.validate();
        assert!(!report.is_valid());
        assert!(report.issues.iter().any(|i| i.field == "name"));
    }

    #[test]
    fn test_alias_collides_with_host_name() {
        let d = valid_descriptor().with_remote(
            "shell",
            RemoteRef::new("shell", "http://localhost:3003/remoteEntry.js"),
        );
        let report = d.validate();
        assert!(!report.is_valid());
    }

    #[test]
    fn test_validation_collects_all_findings() {
        let mut d = valid_descriptor();
        d.name = "bad name".to_string();
        d.filename = String::new();
        let report = d.validate();
        assert_eq!(report.error_count(), 2);
    }

    #[test]
    fn test_expose_key_must_be_relative() {
        let d = valid_descriptor().with_expose("store", "./src/store/index.js");
        let report = d.validate();
        assert!(!report.is_valid());
    }

    #[test]
    fn test_http_to_remote_host_is_a_warning() {
        let d = valid_descriptor().with_remote(
            "cdnApp",
            RemoteRef::new("cdnApp", "http://cdn.example.com/remoteEntry.js"),
        );
        let report = d.validate();
        assert!(report.is_valid());
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_unconstrained_singleton_warns() {
        let d = valid_descriptor().with_shared("vuex", SharedSpec::singleton("*").unwrap());
        let report = d.validate();
        assert!(report.is_valid());
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_check_exposes_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let d = valid_descriptor();
        let report = d.check_exposes(dir.path());
        assert_eq!(report.error_count(), 1);
    }

    #[test]
    fn test_check_exposes_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src/store");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("index.js"), "export default {}").unwrap();

        let d = valid_descriptor();
        assert!(d.check_exposes(dir.path()).is_valid());
        assert!(d.ensure_valid(dir.path()).is_ok());
    }
}
