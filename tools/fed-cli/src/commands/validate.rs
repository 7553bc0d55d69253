//! Validate a descriptor against the project tree.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use fed_core::{HostDescriptor, ValidationIssue, ValidationReport};

use super::ValidateArgs;
use crate::context::Context;

const SOURCE_EXTENSIONS: [&str; 6] = ["js", "jsx", "ts", "tsx", "mjs", "vue"];

/// Run the validate command.
pub async fn run(args: ValidateArgs, ctx: &Context) -> Result<()> {
    let (descriptor, path) = ctx.require_descriptor()?;
    ctx.output.header("Descriptor validation");
    ctx.output.debug(&format!("descriptor: {}", path.display()));

    let project_root = args
        .project_root
        .as_deref()
        .map(|p| ctx.resolve_path(p))
        .unwrap_or_else(|| ctx.project_root());

    let mut report = descriptor.validate();
    report.merge(descriptor.check_exposes(&project_root));

    if !args.no_scan {
        let src = args
            .src
            .as_deref()
            .map(|p| ctx.resolve_path(p))
            .unwrap_or_else(|| project_root.join("src"));
        if src.is_dir() {
            report.merge(scan_import_sites(&descriptor, &src)?);
        } else {
            ctx.output
                .debug(&format!("no source directory at {}, skipping scan", src.display()));
        }
    }

    if ctx.output.is_json() {
        ctx.output.json(&report);
    } else {
        for issue in &report.issues {
            let line = format!("{}: {}", issue.field, issue.message);
            if issue.is_error() {
                ctx.output.error(&line);
            } else {
                ctx.output.warn(&line);
            }
        }
    }

    if !report.is_valid() {
        bail!("{} error(s), {} warning(s)", report.error_count(), report.warning_count());
    }

    ctx.output.success(&format!(
        "descriptor is valid ({} warning(s))",
        report.warning_count()
    ));
    Ok(())
}

/// Cross-reference declared aliases against dynamic import sites.
///
/// Every alias used in an `import("alias/...")` site must be declared in the
/// descriptor; a declared alias no import site uses is a warning.
fn scan_import_sites(descriptor: &HostDescriptor, src: &Path) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    let mut used: BTreeSet<String> = BTreeSet::new();

    for file in source_files(src)? {
        let content = match std::fs::read_to_string(&file) {
            Ok(c) => c,
            // Binary or unreadable files are not import sites.
            Err(_) => continue,
        };
        for alias in import_aliases(&content) {
            if !descriptor.remotes.contains_key(&alias) {
                report.push(ValidationIssue::error(
                    format!("remotes.{}", alias),
                    format!("'{}' imports undeclared alias '{}'", file.display(), alias),
                ));
            }
            used.insert(alias);
        }
    }

    for alias in descriptor.remotes.keys() {
        if !used.contains(alias) {
            report.push(ValidationIssue::warning(
                format!("remotes.{}", alias),
                "declared but never imported",
            ));
        }
    }

    Ok(report)
}

/// Collect source files under a directory, skipping dependency trees.
fn source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();

            if path.is_dir() {
                if name == "node_modules" || name.starts_with('.') {
                    continue;
                }
                stack.push(path);
            } else if path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e))
            {
                files.push(path);
            }
        }
    }

    Ok(files)
}

/// Extract alias prefixes from dynamic import specifiers in a source text.
///
/// Matches `import("alias/path")` and `import('alias/path')`. Relative and
/// absolute specifiers are not federation imports.
fn import_aliases(source: &str) -> Vec<String> {
    let mut aliases = Vec::new();
    let mut rest = source;

    while let Some(at) = rest.find("import(") {
        rest = &rest[at + "import(".len()..];
        let trimmed = rest.trim_start();
        let Some(quote) = trimmed.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        let body = &trimmed[1..];
        let Some(end) = body.find(quote) else {
            continue;
        };
        let specifier = &body[..end];

        if specifier.starts_with('.') || specifier.starts_with('/') {
            continue;
        }
        if let Some((alias, _)) = specifier.split_once('/') {
            if !alias.is_empty() {
                aliases.push(alias.to_string());
            }
        }
    }

    aliases
}

#[cfg(test)]
mod tests {
    use fed_core::RemoteRef;

    use super::*;

    #[test]
    fn test_import_aliases_extraction() {
        let source = r#"
            const users = () => import("usersApp/UserList");
            const edit = () => import('editUserApp/EditUser');
            const local = () => import("./components/Header.vue");
            const bare = () => import("vue");
        "#;
        assert_eq!(import_aliases(source), vec!["usersApp", "editUserApp"]);
    }

    #[test]
    fn test_import_aliases_ignores_unterminated() {
        assert!(import_aliases("import(someVar)").is_empty());
        assert!(import_aliases("import(\"unterminated").is_empty());
    }

    #[test]
    fn test_scan_flags_undeclared_and_unused() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(
            src.join("router.js"),
            r#"const users = () => import("usersApp/UserList");"#,
        )
        .unwrap();

        let descriptor = HostDescriptor::new("shell", "remoteEntry.js").with_remote(
            "editUserApp",
            RemoteRef::new("editUserApp", "http://localhost:3002/remoteEntry.js"),
        );

        let report = scan_import_sites(&descriptor, &src).unwrap();
        // usersApp used but not declared; editUserApp declared but unused.
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_scan_clean_when_aliases_line_up() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("node_modules")).unwrap();
        std::fs::write(
            src.join("router.js"),
            r#"const users = () => import("usersApp/UserList");"#,
        )
        .unwrap();
        // Imports inside dependency trees are not the host's import sites.
        std::fs::write(
            src.join("node_modules").join("dep.js"),
            r#"import("ghostApp/Thing")"#,
        )
        .unwrap();

        let descriptor = HostDescriptor::new("shell", "remoteEntry.js").with_remote(
            "usersApp",
            RemoteRef::new("usersApp", "http://localhost:3001/remoteEntry.js"),
        );

        let report = scan_import_sites(&descriptor, &src).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.warning_count(), 0);
    }
}
