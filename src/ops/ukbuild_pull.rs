//! Implementation of `ukbuild pull`.
//!
//! Two modes: with no arguments (or a project directory as first argument)
//! every component of that project is pulled; otherwise each argument is a
//! package locator routed to whichever manager claims it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::core::format::PackageFormat;
use crate::core::project::{Project, ProjectError};
use crate::ops::errors::{is_cancelled, OpsError};
use crate::ops::resolve::{component_query, resolve_component};
use crate::packmanager::{
    CatalogQuery, PackageManager, PackageManagers, PullOptions as PackagePullOptions, PullOutcome,
};
use crate::util::context::GlobalContext;

/// Options for the pull command.
#[derive(Debug, Clone)]
pub struct PullOptions {
    /// Manager used in directory mode; `auto` uses the default
    pub manager: PackageFormat,

    /// Answer queries from the local catalog index
    pub force_cache: bool,

    /// Skip checksum verification of pulled packages
    pub no_checksum: bool,
}

impl Default for PullOptions {
    fn default() -> Self {
        PullOptions {
            manager: PackageFormat::auto(),
            force_cache: false,
            no_checksum: false,
        }
    }
}

/// A package that was pulled (or already present).
#[derive(Debug)]
pub struct PulledPackage {
    pub package: String,
    pub outcome: PullOutcome,
}

/// An argument or query that produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub item: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct PullReport {
    pub pulled: Vec<PulledPackage>,
    pub skipped: Vec<Skipped>,
}

impl PullReport {
    fn skip(&mut self, item: impl Into<String>, reason: impl Into<String>) {
        let skipped = Skipped {
            item: item.into(),
            reason: reason.into(),
        };
        tracing::warn!("{}: {}", skipped.item, skipped.reason);
        self.skipped.push(skipped);
    }
}

/// Pull the components of a project, or a list of packages.
///
/// Packages land in `workdir` unless the first argument names a project
/// directory, which then becomes the destination.
pub fn pull(
    ctx: &GlobalContext,
    managers: &PackageManagers,
    workdir: &Path,
    args: &[String],
    options: &PullOptions,
) -> Result<PullReport> {
    let mut report = PullReport::default();
    let manager = managers.route(&options.manager).map_err(OpsError::from)?;

    let directory = match args.first() {
        None => Some(workdir.to_path_buf()),
        Some(first) if Path::new(first).is_dir() => Some(PathBuf::from(first)),
        Some(_) => None,
    };

    let (dest, queries) = match directory {
        Some(dir) => {
            let queries = project_queries(ctx, manager.as_ref(), &dir, options)?
                .into_iter()
                .map(|q| (manager.clone(), q))
                .collect();
            (dir, queries)
        }
        None => (
            workdir.to_path_buf(),
            locator_queries(managers, &manager, args, options, &mut report),
        ),
    };

    // Existing, checksum-matching packages are left alone, which keeps a
    // repeated pull a no-op.
    let pull_options = PackagePullOptions::new(&dest)
        .with_checksum(!options.no_checksum)
        .with_cache(true)
        .with_cancellation(ctx.cancellation().clone());

    for (manager, query) in queries {
        ctx.check_cancelled().map_err(OpsError::from)?;

        let packages = match manager.catalog(&query) {
            Ok(packages) => packages,
            Err(e) if is_cancelled(&e) => return Err(e),
            Err(e) => {
                report.skip(query.to_string(), format!("{:#}", e));
                continue;
            }
        };

        if packages.is_empty() {
            report.skip(query.to_string(), format!("could not find {}", query));
            continue;
        }

        for package in packages {
            ctx.check_cancelled().map_err(OpsError::from)?;

            let name = package.type_name_version();
            tracing::info!("pulling {}", name);
            match package.pull(&pull_options) {
                Ok(outcome) => report.pulled.push(PulledPackage {
                    package: name,
                    outcome,
                }),
                Err(e) if is_cancelled(&e) => return Err(e),
                Err(e) => report.skip(name, format!("{:#}", e)),
            }
        }
    }

    Ok(report)
}

/// Queries for every component of the project in `dir`.
///
/// A template that is not yet materialized is resolved and pulled first,
/// since its components are only known once its manifest is on disk.
fn project_queries(
    ctx: &GlobalContext,
    manager: &dyn PackageManager,
    dir: &Path,
    options: &PullOptions,
) -> Result<Vec<CatalogQuery>> {
    let project = Project::load(dir).map_err(OpsError::from)?;
    let no_cache = !options.force_cache;

    match project.components() {
        Ok(_) => {}
        Err(ProjectError::TemplateNotMaterialized { .. }) => {
            if let Some(template) = project.template() {
                let package = resolve_component(manager, template, no_cache, ctx.cancellation())?;
                tracing::info!("pulling template {}", package.type_name_version());
                package.pull(
                    &PackagePullOptions::new(dir).with_cancellation(ctx.cancellation().clone()),
                )?;
            }
        }
        Err(e) => return Err(OpsError::from(e).into()),
    }

    let project = match project.template() {
        Some(template) => {
            Project::load(&template.placement(dir))
                .map_err(OpsError::from)?
                .merge_template(&project)
        }
        None => project,
    };

    let components = project.components().map_err(OpsError::from)?;
    Ok(components
        .iter()
        .map(|c| component_query(c, no_cache))
        .collect())
}

/// Name-only queries for each locator some manager claims.
///
/// With an explicit manager only that backend is asked; with `auto` every
/// registered backend is probed in order.
fn locator_queries(
    managers: &PackageManagers,
    routed: &Arc<dyn PackageManager>,
    args: &[String],
    options: &PullOptions,
    report: &mut PullReport,
) -> Vec<(Arc<dyn PackageManager>, CatalogQuery)> {
    let mut queries = Vec::new();
    for arg in args {
        let claimed = if options.manager.is_auto() {
            managers.probe(arg)
        } else {
            match routed.is_compatible(arg) {
                Ok(true) => Some(Arc::clone(routed)),
                Ok(false) => None,
                Err(e) => {
                    tracing::debug!("`{}` failed to probe `{}`: {:#}", routed.format(), arg, e);
                    None
                }
            }
        };

        match claimed {
            Some(manager) => {
                queries.push((
                    manager,
                    CatalogQuery::new(arg.as_str()).with_no_cache(!options.force_cache),
                ));
            }
            None => report.skip(arg.as_str(), "no package manager is compatible"),
        }
    }
    queries
}
