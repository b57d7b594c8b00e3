//! Global context for ukbuild operations.
//!
//! Provides centralized access to paths, verbosity and the cancellation
//! token shared by every long-running operation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use thiserror::Error;

use crate::util::config::{load_config, project_config_path, Config};

/// Environment variable overriding the ukbuild home directory.
pub const HOME_ENV: &str = "UKBUILD_HOME";

/// Project directories for ukbuild
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("sh", "unikraft", "ukbuild"));

/// Returned when an operation notices it has been cancelled.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// A cheaply clonable cancellation flag.
///
/// Cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fail with [`Cancelled`] once the token has been cancelled.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Global context containing paths and shared state.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global ukbuild data
    home: PathBuf,

    /// Whether to use verbose output
    verbose: bool,

    cancel: CancellationToken,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = if let Some(home) = std::env::var_os(HOME_ENV) {
            PathBuf::from(home)
        } else if let Some(dirs) = PROJECT_DIRS.as_ref() {
            dirs.data_dir().to_path_buf()
        } else {
            directories::BaseDirs::new()
                .map(|b| b.home_dir().join(".ukbuild"))
                .unwrap_or_else(|| PathBuf::from(".ukbuild"))
        };

        Ok(GlobalContext {
            cwd,
            home,
            verbose: false,
            cancel: CancellationToken::new(),
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Use a specific home directory.
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the ukbuild home directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// File listing the registered catalog sources.
    pub fn sources_path(&self) -> PathBuf {
        self.home.join("sources.toml")
    }

    /// Cached catalog index written by `update`.
    pub fn index_path(&self) -> PathBuf {
        self.home.join("index.json")
    }

    /// Load the global config merged with the config of `workdir`.
    pub fn load_config(&self, workdir: &Path) -> Config {
        load_config(&self.config_path(), &project_config_path(workdir))
    }

    /// The cancellation token shared by operations run with this context.
    ///
    /// Nothing inside the crate cancels it. The `ukbuild` binary exits on
    /// interrupt without cancelling; library callers that embed operations
    /// clone this token and call [`CancellationToken::cancel`] to stop them
    /// at the next check point.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail if the operation has been cancelled.
    pub fn check_cancelled(&self) -> Result<(), Cancelled> {
        self.cancel.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_paths() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf())
            .unwrap()
            .with_home(tmp.path().join("home"));

        assert_eq!(ctx.cwd(), tmp.path());
        assert_eq!(ctx.sources_path(), tmp.path().join("home/sources.toml"));
        assert_eq!(ctx.index_path(), tmp.path().join("home/index.json"));
    }

    #[test]
    fn test_cancellation_shared_between_clones() {
        let ctx = GlobalContext::new().unwrap();
        let clone = ctx.clone();

        assert!(ctx.check_cancelled().is_ok());
        clone.cancellation().cancel();
        assert_eq!(ctx.check_cancelled(), Err(Cancelled));
    }
}
