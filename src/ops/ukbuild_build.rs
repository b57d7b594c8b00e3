//! Implementation of `ukbuild build`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};

use crate::builder::driver::{BuildDriver, ConfigureOptions, Jobs, MakeOptions};
use crate::builder::events::{Stage, StageEvent, StageObserver};
use crate::core::format::PackageFormat;
use crate::core::project::{is_workdir_initialized, Project, ProjectError};
use crate::core::target::{KConfig, Target};
use crate::ops::errors::{is_cancelled, OpsError};
use crate::ops::resolve::{pull_packages, resolve_components};
use crate::ops::select::TargetFilter;
use crate::packmanager::{PackageManagers, PullOptions};
use crate::util::context::{Cancelled, GlobalContext};
use crate::util::fs;

/// What to do when a target fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure and move on to the next target.
    #[default]
    BestEffort,

    /// Stop at the first failure.
    FailFast,
}

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Which targets to build
    pub filter: TargetFilter,

    /// Alternative `.config` whose values are applied on configure
    pub dot_config: Option<PathBuf>,

    /// Use every CPU when no job count is given
    pub fast: bool,

    /// Parallel jobs (0 = derive)
    pub jobs: usize,

    /// Report the debug kernel as the build artifact
    pub kernel_dbg: bool,

    /// Bypass catalog caches and re-pull components
    pub no_cache: bool,

    pub no_configure: bool,

    /// Do not resolve or pull components
    pub no_fetch: bool,

    pub no_prepare: bool,

    /// Copy the build output into this file
    pub save_build_log: Option<PathBuf>,

    pub policy: FailurePolicy,
}

/// Outcome of one target.
#[derive(Debug)]
pub struct TargetOutcome {
    pub target: String,

    /// Kernel image the target produces
    pub kernel: PathBuf,

    pub error: Option<OpsError>,
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a build run.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub outcomes: Vec<TargetOutcome>,
}

impl BuildReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.is_success())
    }
}

/// Build the selected targets of the project in `workdir`.
///
/// Components are resolved and pulled first (unless `no_fetch`), then each
/// selected target runs configure, prepare and build. A failing target is
/// reported in the returned [`BuildReport`]; with [`FailurePolicy::FailFast`]
/// it aborts the run instead.
pub fn build(
    ctx: &GlobalContext,
    managers: &PackageManagers,
    driver: &dyn BuildDriver,
    observer: &dyn StageObserver,
    workdir: &Path,
    options: &BuildOptions,
) -> Result<BuildReport> {
    options.filter.validate()?;

    if !is_workdir_initialized(workdir) {
        return Err(OpsError::from(ProjectError::Uninitialized {
            workdir: workdir.to_path_buf(),
        })
        .into());
    }

    let project = Project::load_with_template(workdir).map_err(OpsError::from)?;

    if options.no_fetch {
        tracing::debug!("skipping dependency resolution");
    } else {
        fetch_components(ctx, managers, &project, options.no_cache)?;
    }

    let selected = options.filter.select(project.targets());
    if selected.is_empty() {
        return Err(OpsError::NoTargetsSelected { action: "build" }.into());
    }

    let extra = match &options.dot_config {
        Some(path) => load_dot_config(path)?,
        None => KConfig::new(),
    };
    let configure = ConfigureOptions {
        extra,
        silent: true,
    };
    let jobs = Jobs::from_options(options.jobs, options.fast);
    let multiple = selected.len() > 1;

    let started = Instant::now();
    let mut report = BuildReport::default();

    for target in selected {
        ctx.check_cancelled().map_err(OpsError::from)?;

        let target = target.clone().with_kernel_dbg(options.kernel_dbg);
        let make = MakeOptions {
            jobs,
            log_file: options
                .save_build_log
                .as_ref()
                .map(|path| build_log_path(path, &target, multiple)),
            silent: false,
        };

        let result = run_target(ctx, driver, observer, &project, &target, &configure, &make, options);
        let kernel = if target.kernel_dbg() {
            target.kernel_dbg_path()
        } else {
            target.kernel().to_path_buf()
        };

        match result {
            Ok(()) => report.outcomes.push(TargetOutcome {
                target: target.name().to_string(),
                kernel,
                error: None,
            }),
            Err(OpsError::Cancelled(c)) => return Err(OpsError::Cancelled(c).into()),
            Err(e) if options.policy == FailurePolicy::FailFast => return Err(e.into()),
            Err(e) => {
                tracing::warn!("{}", e);
                report.outcomes.push(TargetOutcome {
                    target: target.name().to_string(),
                    kernel,
                    error: Some(e),
                });
            }
        }
    }

    let failed = report.failed().count() as u64;
    observer.on_event(&StageEvent::build_finished(
        report.outcomes.len() as u64,
        failed,
        started.elapsed().as_millis() as u64,
    ));

    Ok(report)
}

/// Resolve every project component with the default package manager and
/// pull them into the workdir.
fn fetch_components(
    ctx: &GlobalContext,
    managers: &PackageManagers,
    project: &Project,
    no_cache: bool,
) -> Result<()> {
    let components = project.components().map_err(OpsError::from)?;
    if components.is_empty() {
        return Ok(());
    }

    let manager = managers.route(&PackageFormat::auto()).map_err(OpsError::from)?;
    let packages = resolve_components(manager.as_ref(), &components, no_cache, ctx.cancellation())?;

    let pull = PullOptions::new(project.workdir())
        .with_cache(!no_cache)
        .with_cancellation(ctx.cancellation().clone());
    pull_packages(&packages, &pull)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_target(
    ctx: &GlobalContext,
    driver: &dyn BuildDriver,
    observer: &dyn StageObserver,
    project: &Project,
    target: &Target,
    configure: &ConfigureOptions,
    make: &MakeOptions,
    options: &BuildOptions,
) -> Result<(), OpsError> {
    run_stage(ctx, observer, target, Stage::Configure, options.no_configure, &|| {
        driver.configure(project, target, configure)
    })?;
    run_stage(ctx, observer, target, Stage::Prepare, options.no_prepare, &|| {
        driver.prepare(project, target, make)
    })?;
    run_stage(ctx, observer, target, Stage::Build, false, &|| {
        driver.build(project, target, make)
    })
}

/// Run one stage, reporting it to `observer` and attributing failures to
/// `target`.
fn run_stage(
    ctx: &GlobalContext,
    observer: &dyn StageObserver,
    target: &Target,
    stage: Stage,
    skip: bool,
    run: &dyn Fn() -> Result<()>,
) -> Result<(), OpsError> {
    if skip {
        observer.on_event(&StageEvent::skipped(target.name(), stage));
        return Ok(());
    }

    ctx.check_cancelled()?;
    observer.on_event(&StageEvent::started(target.name(), stage));
    let started = Instant::now();

    match run() {
        Ok(()) => {
            observer.on_event(&StageEvent::finished(
                target.name(),
                stage,
                started.elapsed().as_millis() as u64,
            ));
            Ok(())
        }
        Err(e) if is_cancelled(&e) => Err(OpsError::Cancelled(Cancelled)),
        Err(e) => {
            let message = format!("{:#}", e);
            observer.on_event(&StageEvent::failed(target.name(), stage, message.clone()));
            Err(OpsError::Stage {
                stage,
                target: target.name().to_string(),
                message,
            })
        }
    }
}

fn load_dot_config(path: &Path) -> Result<KConfig> {
    let contents = fs::read_to_string(path)?;
    KConfig::parse_dotconfig(&contents)
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// One log per target when several targets share a `--save-build-log` path.
fn build_log_path(base: &Path, target: &Target, multiple: bool) -> PathBuf {
    if !multiple {
        return base.to_path_buf();
    }
    let mut name = base.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}", target.name()));
    base.with_file_name(name)
}
