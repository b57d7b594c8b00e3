//! Kraftfile.toml manifest parsing and schema.
//!
//! The manifest declares a project's name, an optional template it builds on,
//! its components and its build targets. `Kraftfile.toml` is canonical and
//! `kraft.toml` is accepted as an alias.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::target::KConfig;

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "Kraftfile.toml";

/// Accepted alias for the manifest file name.
pub const MANIFEST_ALIAS: &str = "kraft.toml";

/// Errors locating or parsing a manifest.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ManifestError {
    #[error("no Kraftfile.toml found in {}", dir.display())]
    #[diagnostic(
        code(ukbuild::manifest::not_found),
        help("create a Kraftfile.toml describing the project and its targets")
    )]
    NotFound { dir: PathBuf },

    #[error("both {} and {} exist", primary.display(), alias.display())]
    #[diagnostic(
        code(ukbuild::manifest::ambiguous),
        help("remove one of the two manifest files")
    )]
    AmbiguousManifest { primary: PathBuf, alias: PathBuf },

    #[error("failed to read {}: {message}", path.display())]
    #[diagnostic(code(ukbuild::manifest::io))]
    Io { path: PathBuf, message: String },

    #[error("failed to parse {}: {message}", path.display())]
    #[diagnostic(code(ukbuild::manifest::parse))]
    Parse {
        path: PathBuf,
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },
}

/// Locate the manifest in `dir`.
pub fn find_manifest(dir: &Path) -> Result<PathBuf, ManifestError> {
    let primary = dir.join(MANIFEST_NAME);
    let alias = dir.join(MANIFEST_ALIAS);

    match (primary.is_file(), alias.is_file()) {
        (true, true) => Err(ManifestError::AmbiguousManifest { primary, alias }),
        (true, false) => Ok(primary),
        (false, true) => Ok(alias),
        (false, false) => Err(ManifestError::NotFound {
            dir: dir.to_path_buf(),
        }),
    }
}

/// A component declaration.
///
/// Either a bare version string (`musl = "stable"`) or a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentSpec {
    Version(String),
    Detailed(DetailedComponentSpec),
}

/// Table form of a component declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedComponentSpec {
    /// Explicit name (used by `template` and `unikraft`)
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub version: String,

    /// Origin locator
    #[serde(default)]
    pub source: String,

    /// Kconfig values this component contributes
    #[serde(default)]
    pub kconfig: KConfig,
}

impl ComponentSpec {
    pub fn name(&self) -> Option<&str> {
        match self {
            ComponentSpec::Version(_) => None,
            ComponentSpec::Detailed(d) => d.name.as_deref(),
        }
    }

    pub fn version(&self) -> &str {
        match self {
            ComponentSpec::Version(v) => v,
            ComponentSpec::Detailed(d) => &d.version,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            ComponentSpec::Version(_) => "",
            ComponentSpec::Detailed(d) => &d.source,
        }
    }

    pub fn kconfig(&self) -> KConfig {
        match self {
            ComponentSpec::Version(_) => KConfig::new(),
            ComponentSpec::Detailed(d) => d.kconfig.clone(),
        }
    }
}

/// A `[[targets]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Target name (defaults to `<project>-<plat>-<arch>`)
    #[serde(default)]
    pub name: Option<String>,

    #[serde(alias = "arch")]
    pub architecture: String,

    #[serde(alias = "plat")]
    pub platform: String,

    /// Declared package format
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub kconfig: KConfig,

    #[serde(default)]
    pub initrd: Option<PathBuf>,

    #[serde(default)]
    pub command: Vec<String>,
}

/// The parsed manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,

    /// Base project this one is merged on top of
    #[serde(default)]
    pub template: Option<ComponentSpec>,

    /// The unikernel core
    #[serde(default)]
    pub unikraft: Option<ComponentSpec>,

    #[serde(default)]
    pub libraries: BTreeMap<String, ComponentSpec>,

    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

impl Manifest {
    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&contents, path)
    }

    /// Parse manifest contents; `path` is used for error reporting only.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(contents).map_err(|e| ManifestError::Parse {
            path: path.to_path_buf(),
            message: e.message().to_string(),
            src: NamedSource::new(path.display().to_string(), contents.to_string()),
            span: e.span().map(|r| SourceSpan::from(r.start..r.end)),
        })?;

        if manifest.name.trim().is_empty() {
            return Err(ManifestError::Parse {
                path: path.to_path_buf(),
                message: "`name` must not be empty".to_string(),
                src: NamedSource::new(path.display().to_string(), contents.to_string()),
                span: None,
            });
        }

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO: &str = r#"
name = "helloworld"
template = { name = "helloworld", version = "stable" }

[unikraft]
version = "stable"
kconfig = ["CONFIG_LIBUKDEBUG=y"]

[libraries]
musl = "stable"
lwip = { version = "0.14", source = "file:///srv/catalog" }

[[targets]]
architecture = "x86_64"
platform = "qemu"
format = "raw"
kconfig = ["UK_FULLVERSION=0.17.0"]

[[targets]]
name = "hello-arm"
arch = "arm64"
plat = "qemu"
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(HELLO, Path::new("Kraftfile.toml")).unwrap();

        assert_eq!(manifest.name, "helloworld");
        assert_eq!(manifest.template.as_ref().unwrap().name(), Some("helloworld"));
        assert_eq!(manifest.unikraft.as_ref().unwrap().version(), "stable");
        assert_eq!(manifest.libraries["musl"].version(), "stable");
        assert_eq!(manifest.libraries["lwip"].source(), "file:///srv/catalog");
        assert_eq!(manifest.targets.len(), 2);
        assert_eq!(manifest.targets[0].format.as_deref(), Some("raw"));
        assert_eq!(manifest.targets[1].architecture, "arm64");
    }

    #[test]
    fn test_parse_error_has_span() {
        let err = Manifest::parse("name = ", Path::new("Kraftfile.toml")).unwrap_err();
        match err {
            ManifestError::Parse { span, .. } => assert!(span.is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_find_manifest_ambiguous() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(MANIFEST_NAME), "name = \"a\"\n").unwrap();
        std::fs::write(tmp.path().join(MANIFEST_ALIAS), "name = \"b\"\n").unwrap();

        assert!(matches!(
            find_manifest(tmp.path()),
            Err(ManifestError::AmbiguousManifest { .. })
        ));
    }

    #[test]
    fn test_find_manifest_missing() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            find_manifest(tmp.path()),
            Err(ManifestError::NotFound { .. })
        ));
    }
}
