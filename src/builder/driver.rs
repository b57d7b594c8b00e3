//! BuildDriver trait definition and stage option types.
//!
//! A build driver runs the configure, prepare and build stages of a single
//! target. Stage sequencing, skipping and failure handling live in
//! `ops::ukbuild_build`; drivers only execute.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::project::Project;
use crate::core::target::{KConfig, Target};

/// Parallelism requested from the build backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jobs {
    /// An explicit job count.
    Fixed(usize),

    /// As many jobs as the host allows when `fast`, otherwise the backend's
    /// own default.
    Max { fast: bool },
}

impl Jobs {
    /// A positive `jobs` wins; otherwise fall back to [`Jobs::Max`].
    pub fn from_options(jobs: usize, fast: bool) -> Self {
        if jobs > 0 {
            Jobs::Fixed(jobs)
        } else {
            Jobs::Max { fast }
        }
    }

    /// Job count to pass on, `None` leaving the choice to the backend.
    pub fn count(&self) -> Option<usize> {
        match *self {
            Jobs::Fixed(n) => Some(n),
            Jobs::Max { fast: true } => Some(
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1),
            ),
            Jobs::Max { fast: false } => None,
        }
    }
}

impl Default for Jobs {
    fn default() -> Self {
        Jobs::Max { fast: false }
    }
}

/// Options for the configure stage.
#[derive(Debug, Clone)]
pub struct ConfigureOptions {
    /// Values applied on top of the target kconfig
    pub extra: KConfig,

    /// Log backend output at debug level only
    pub silent: bool,
}

impl Default for ConfigureOptions {
    fn default() -> Self {
        ConfigureOptions {
            extra: KConfig::new(),
            silent: true,
        }
    }
}

/// Options for the prepare and build stages.
#[derive(Debug, Clone, Default)]
pub struct MakeOptions {
    pub jobs: Jobs,

    /// Copy of the backend output (build stage only)
    pub log_file: Option<PathBuf>,

    pub silent: bool,
}

/// A build backend.
pub trait BuildDriver: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Write the target configuration and let the backend complete it.
    fn configure(&self, project: &Project, target: &Target, options: &ConfigureOptions)
        -> Result<()>;

    /// Prepare the source tree of the target.
    fn prepare(&self, project: &Project, target: &Target, options: &MakeOptions) -> Result<()>;

    /// Compile and link the target.
    fn build(&self, project: &Project, target: &Target, options: &MakeOptions) -> Result<()>;

    /// Remove every build output of the project.
    fn properclean(&self, project: &Project) -> Result<()>;
}
