//! Project - a loaded Kraftfile and its working directory.
//!
//! A Project exposes the targets and components a manifest declares,
//! resolves paths inside the workdir, and can be merged on top of a
//! template project.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::core::component::{Component, ComponentType, VENDOR_DIR};
use crate::core::manifest::{find_manifest, ComponentSpec, Manifest, ManifestError, TargetSpec};
use crate::core::target::{Architecture, KConfig, Platform, Target};
use crate::util::fs;

/// Name of the kconfig file inside a workdir.
pub const DOTCONFIG: &str = ".config";

/// Errors raised while loading or inspecting a project.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("uninitialized project in {}: no manifest found", workdir.display())]
    Uninitialized { workdir: PathBuf },

    #[error("template `{template}` is not materialized at {}", path.display())]
    TemplateNotMaterialized { template: String, path: PathBuf },

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Check whether `workdir` holds a project manifest.
pub fn is_workdir_initialized(workdir: &Path) -> bool {
    find_manifest(workdir).is_ok()
}

/// A loaded project.
#[derive(Debug, Clone)]
pub struct Project {
    manifest: Manifest,
    workdir: PathBuf,
    targets: Vec<Target>,
    template: Option<Component>,
    template_merged: bool,
    config: KConfig,
}

impl Project {
    /// Load the project in `workdir`.
    pub fn load(workdir: &Path) -> Result<Self, ProjectError> {
        let manifest_path = find_manifest(workdir).map_err(|e| match e {
            ManifestError::NotFound { .. } => ProjectError::Uninitialized {
                workdir: workdir.to_path_buf(),
            },
            other => ProjectError::Manifest(other),
        })?;
        let manifest = Manifest::load(&manifest_path)?;
        Ok(Self::from_manifest(manifest, workdir))
    }

    /// Load the project in `workdir` merged onto its template, when the
    /// template has been materialized with a manifest.
    pub fn load_with_template(workdir: &Path) -> Result<Self, ProjectError> {
        let project = Self::load(workdir)?;
        let path = match project.template() {
            Some(template) => template.placement(workdir),
            None => return Ok(project),
        };
        if !is_workdir_initialized(&path) {
            return Ok(project);
        }
        Ok(Self::load(&path)?.merge_template(&project))
    }

    /// Build a project from an already parsed manifest.
    pub fn from_manifest(manifest: Manifest, workdir: &Path) -> Self {
        let template = manifest.template.as_ref().map(template_component);
        let targets = build_targets(&manifest, workdir);

        Project {
            manifest,
            workdir: workdir.to_path_buf(),
            targets,
            template,
            template_merged: false,
            config: KConfig::new(),
        }
    }

    /// Attach configuration overrides (`KEY=VALUE` pairs given by the caller).
    pub fn with_config(mut self, config: KConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// The template this project builds on, if any.
    pub fn template(&self) -> Option<&Component> {
        self.template.as_ref()
    }

    /// Configuration overrides attached with [`Project::with_config`].
    pub fn config(&self) -> &KConfig {
        &self.config
    }

    /// Enumerate the components this project depends on.
    ///
    /// Fails while a declared template has neither been merged nor
    /// materialized in the workdir, since its components are unknown.
    pub fn components(&self) -> Result<Vec<Component>, ProjectError> {
        if let Some(template) = &self.template {
            let path = template.placement(&self.workdir);
            if !self.template_merged && !path.is_dir() {
                return Err(ProjectError::TemplateNotMaterialized {
                    template: template.type_name_version(),
                    path,
                });
            }
        }

        let mut components = Vec::new();

        if let Some(core) = &self.manifest.unikraft {
            components.push(spec_component(
                core.name().unwrap_or("unikraft"),
                ComponentType::Core,
                core,
            ));
        }

        for (name, spec) in &self.manifest.libraries {
            components.push(spec_component(
                spec.name().unwrap_or(name),
                ComponentType::Lib,
                spec,
            ));
        }

        Ok(components)
    }

    /// Overlay `project` on top of this (template) project.
    ///
    /// The result keeps the project's name and workdir; the project's
    /// components and targets win over the template's.
    pub fn merge_template(&self, project: &Project) -> Project {
        let template = &self.manifest;
        let own = &project.manifest;

        let mut libraries = template.libraries.clone();
        for (name, spec) in &own.libraries {
            libraries.insert(name.clone(), spec.clone());
        }

        let merged = Manifest {
            name: own.name.clone(),
            template: own.template.clone(),
            unikraft: own.unikraft.clone().or_else(|| template.unikraft.clone()),
            libraries,
            targets: if own.targets.is_empty() {
                template.targets.clone()
            } else {
                own.targets.clone()
            },
        };

        let mut result = Project::from_manifest(merged, &project.workdir);
        result.template_merged = true;
        result.config = project.config.clone();
        result
    }

    /// The vendor directory holding materialized components.
    pub fn vendor_dir(&self) -> PathBuf {
        self.workdir.join(VENDOR_DIR)
    }

    /// Build output directory.
    pub fn build_dir(&self) -> PathBuf {
        self.vendor_dir().join("build")
    }

    /// Location of the core sources.
    pub fn core_dir(&self) -> PathBuf {
        crate::core::component::place_component(&self.workdir, ComponentType::Core, "unikraft")
    }

    /// Locations of every library component, in declaration order.
    pub fn library_dirs(&self) -> Vec<PathBuf> {
        self.manifest
            .libraries
            .iter()
            .map(|(name, spec)| {
                crate::core::component::place_component(
                    &self.workdir,
                    ComponentType::Lib,
                    spec.name().unwrap_or(name),
                )
            })
            .collect()
    }

    /// Path of the project's `.config`.
    pub fn dotconfig_path(&self) -> PathBuf {
        self.workdir.join(DOTCONFIG)
    }

    /// Project-wide kconfig contributed by the core and libraries.
    pub fn kconfig(&self) -> KConfig {
        let mut kconfig = KConfig::new();
        if let Some(core) = &self.manifest.unikraft {
            kconfig.merge(&core.kconfig());
        }
        for spec in self.manifest.libraries.values() {
            kconfig.merge(&spec.kconfig());
        }
        kconfig
    }

    /// Write the attached configuration overrides into `.config`.
    ///
    /// Existing keys are updated in place, new keys are appended.
    pub fn set(&self) -> Result<()> {
        let path = self.dotconfig_path();
        let contents = fs::read_to_string(&path)?;
        let mut dotconfig = KConfig::parse_dotconfig(&contents)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("failed to parse {}", path.display()))?;

        dotconfig.merge(&self.config);
        fs::write_string(&path, &dotconfig.to_dotconfig())?;

        tracing::debug!("updated {} value(s) in {}", self.config.len(), path.display());
        Ok(())
    }
}

fn template_component(spec: &ComponentSpec) -> Component {
    match spec {
        ComponentSpec::Version(name) => Component::new(name.clone(), ComponentType::App, ""),
        ComponentSpec::Detailed(d) => Component::new(
            d.name.clone().unwrap_or_default(),
            ComponentType::App,
            d.version.clone(),
        )
        .with_source(d.source.clone()),
    }
}

fn spec_component(name: &str, component_type: ComponentType, spec: &ComponentSpec) -> Component {
    Component::new(name, component_type, spec.version()).with_source(spec.source())
}

fn build_targets(manifest: &Manifest, workdir: &Path) -> Vec<Target> {
    let mut base = KConfig::new();
    if let Some(core) = &manifest.unikraft {
        base.merge(&core.kconfig());
    }
    for spec in manifest.libraries.values() {
        base.merge(&spec.kconfig());
    }

    manifest
        .targets
        .iter()
        .map(|spec| build_target(&manifest.name, workdir, spec, &base))
        .collect()
}

fn build_target(project: &str, workdir: &Path, spec: &TargetSpec, base: &KConfig) -> Target {
    let plat_arch = format!("{}-{}", spec.platform, spec.architecture);
    let name = spec
        .name
        .clone()
        .unwrap_or_else(|| format!("{}-{}", project, plat_arch));

    let kernel = workdir
        .join(VENDOR_DIR)
        .join("build")
        .join(format!("{}_{}", project, plat_arch));

    let mut kconfig = base.clone();
    kconfig.merge(&spec.kconfig);

    Target::new(
        name,
        Architecture::new(spec.architecture.clone()),
        Platform::new(spec.platform.clone()),
    )
    .with_kernel(kernel)
    .with_kconfig(kconfig)
    .with_initrd(spec.initrd.as_ref().map(|p| workdir.join(p)))
    .with_command(spec.command.clone())
    .with_format(spec.format.clone().unwrap_or_default())
}
