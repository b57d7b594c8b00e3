//! Command implementations

pub mod build;
pub mod pkg;
pub mod properclean;
pub mod pull;
pub mod set;
pub mod source;
pub mod update;

use std::path::{Path, PathBuf};

use anyhow::Result;
use ukbuild::builder::events::{StageObserver, TracingObserver};
use ukbuild::ops::{OpsError, TargetFilter};
use ukbuild::packmanager::PackageManagers;
use ukbuild::util::{Config, GlobalContext};

use crate::cli::SelectArgs;
use crate::progress::SpinnerObserver;

/// State shared by every command: context, project directory, merged
/// configuration and the package manager registry.
pub struct Session {
    pub ctx: GlobalContext,
    pub workdir: PathBuf,
    pub config: Config,
    pub managers: PackageManagers,
}

impl Session {
    pub fn new(workdir: Option<&Path>, verbose: bool) -> Result<Self> {
        let mut ctx = GlobalContext::new()?;
        ctx.set_verbose(verbose);

        let workdir = match workdir {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => ctx.cwd().join(dir),
            None => ctx.cwd().to_path_buf(),
        };

        let config = ctx.load_config(&workdir);
        let managers = PackageManagers::with_builtin(&ctx, &config).map_err(OpsError::from)?;

        Ok(Session {
            ctx,
            workdir,
            config,
            managers,
        })
    }

    /// Spinner on a terminal, plain log lines in verbose mode.
    pub fn observer(&self) -> Box<dyn StageObserver> {
        if self.ctx.is_verbose() {
            Box::new(TracingObserver)
        } else {
            Box::new(SpinnerObserver::new())
        }
    }
}

impl SelectArgs {
    pub fn filter(&self) -> TargetFilter {
        TargetFilter::from_options(
            self.architecture.clone(),
            self.platform.clone(),
            self.target.clone(),
        )
    }
}
