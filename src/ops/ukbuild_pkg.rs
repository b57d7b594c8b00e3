//! Implementation of `ukbuild pkg`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;

use crate::builder::events::{Stage, StageEvent, StageObserver};
use crate::core::format::PackageFormat;
use crate::core::project::Project;
use crate::core::target::{Target, UK_FULLVERSION};
use crate::ops::errors::{is_cancelled, OpsError};
use crate::ops::select::TargetFilter;
use crate::ops::ukbuild_build::FailurePolicy;
use crate::packmanager::{PackOptions, Package, PackageManagers};
use crate::util::context::{Cancelled, GlobalContext};

/// Options for the package command.
#[derive(Debug, Clone)]
pub struct PackageOptions {
    /// Which targets to package
    pub filter: TargetFilter,

    /// Package format; `auto` uses each target's declared format
    pub format: PackageFormat,

    /// Name given to the packaged target (empty = keep the target name)
    pub name: String,

    pub output: Option<PathBuf>,

    /// Initramfs overriding the target's
    pub initrd: Option<PathBuf>,

    /// Kernel image overriding the target's
    pub kernel: Option<PathBuf>,

    /// Package the unstripped kernel
    pub dbg: bool,

    /// Include the target kconfig
    pub with_kconfig: bool,

    /// Overwrite existing outputs
    pub force: bool,

    pub policy: FailurePolicy,
}

impl Default for PackageOptions {
    fn default() -> Self {
        PackageOptions {
            filter: TargetFilter::default(),
            format: PackageFormat::auto(),
            name: String::new(),
            output: None,
            initrd: None,
            kernel: None,
            dbg: false,
            with_kconfig: false,
            force: false,
            policy: FailurePolicy::FailFast,
        }
    }
}

/// A target that was packaged.
#[derive(Debug)]
pub struct PackagedTarget {
    pub target: String,
    pub format: PackageFormat,
    pub package: Box<dyn Package>,
}

/// Result of a packaging run.
#[derive(Debug, Default)]
pub struct PackageReport {
    pub packaged: Vec<PackagedTarget>,

    /// Targets that failed, with their error (best-effort runs only)
    pub failures: Vec<OpsError>,
}

impl PackageReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Pick the package format for `target`.
///
/// An explicit override wins, then the target's declared format, then `auto`.
pub fn resolve_format(requested: &PackageFormat, target: &Target) -> PackageFormat {
    if !requested.is_auto() {
        requested.clone()
    } else if !target.format().is_empty() {
        target.format().clone()
    } else {
        PackageFormat::auto()
    }
}

/// Progress label: `packaging <target>` plus ` (<format>)` once resolved.
pub fn label(target: &Target, format: &PackageFormat) -> String {
    if format.is_auto() {
        format!("packaging {}", target.name())
    } else {
        format!("packaging {} ({})", target.name(), format)
    }
}

/// Package every selected target of the project in `workdir`.
pub fn package(
    ctx: &GlobalContext,
    managers: &PackageManagers,
    observer: &dyn StageObserver,
    workdir: &Path,
    options: &PackageOptions,
) -> Result<PackageReport> {
    options.filter.validate()?;

    let project = Project::load_with_template(workdir).map_err(OpsError::from)?;

    let selected = options.filter.select(project.targets());
    if selected.is_empty() {
        return Err(OpsError::NoTargetsSelected { action: "package" }.into());
    }

    let mut report = PackageReport::default();

    for target in selected {
        ctx.check_cancelled().map_err(OpsError::from)?;

        match package_target(ctx, managers, observer, target, options) {
            Ok(packaged) => report.packaged.push(packaged),
            Err(OpsError::Cancelled(c)) => return Err(OpsError::Cancelled(c).into()),
            Err(e) if options.policy == FailurePolicy::FailFast => return Err(e.into()),
            Err(e) => {
                tracing::warn!("{}", e);
                report.failures.push(e);
            }
        }
    }

    Ok(report)
}

fn package_target(
    ctx: &GlobalContext,
    managers: &PackageManagers,
    observer: &dyn StageObserver,
    target: &Target,
    options: &PackageOptions,
) -> Result<PackagedTarget, OpsError> {
    let format = resolve_format(&options.format, target);
    let manager = managers.route(&format)?;

    let pack_options = PackOptions {
        kconfig: options.with_kconfig,
        output: options.output.clone(),
        initrd: options.initrd.clone(),
        kernel_version: target
            .kconfig()
            .get(UK_FULLVERSION)
            .map(|v| v.unquoted().to_string()),
        force: options.force,
        cancel: ctx.cancellation().clone(),
    };

    let mut snapshot = target
        .packaging_snapshot(&options.name)
        .with_kernel_dbg(options.dbg || target.kernel_dbg());
    if let Some(kernel) = &options.kernel {
        snapshot = snapshot.with_kernel(kernel.clone());
    }

    observer.on_event(&StageEvent::started_with_label(
        target.name(),
        Stage::Pack,
        label(target, &format),
    ));
    let started = Instant::now();

    match manager.pack(&snapshot, &pack_options) {
        Ok(package) => {
            observer.on_event(&StageEvent::finished(
                target.name(),
                Stage::Pack,
                started.elapsed().as_millis() as u64,
            ));
            Ok(PackagedTarget {
                target: target.name().to_string(),
                format: manager.format(),
                package,
            })
        }
        Err(e) if is_cancelled(&e) => Err(OpsError::Cancelled(Cancelled)),
        Err(e) => {
            let message = format!("{:#}", e);
            observer.on_event(&StageEvent::failed(target.name(), Stage::Pack, message.clone()));
            Err(OpsError::Stage {
                stage: Stage::Pack,
                target: target.name().to_string(),
                message,
            })
        }
    }
}
