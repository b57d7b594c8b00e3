//! Configuration file support for ukbuild.
//!
//! ukbuild reads two configuration files:
//! - Global: `<home>/config.toml` - user-wide defaults
//! - Project: `.ukbuild/config.toml` - project-specific overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// ukbuild configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Package manager settings
    pub packmanager: PackManagerConfig,

    /// Build settings
    pub build: BuildConfig,

    /// Pull settings
    pub pull: PullConfig,
}

/// Package manager configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackManagerConfig {
    /// Format of the backend used when a command asks for `auto`
    pub default: Option<String>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Default number of parallel jobs (None = derive from CPU count)
    pub jobs: Option<usize>,

    /// Use every available CPU when no job count is given
    pub fast: bool,

    /// Bypass catalog caches when resolving components
    pub no_cache: bool,
}

/// Pull-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PullConfig {
    /// Skip checksum verification of pulled packages
    pub no_checksum: bool,

    /// Prefer cached catalog data
    pub force_cache: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.packmanager.default.is_some() {
            self.packmanager.default = other.packmanager.default;
        }

        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.fast {
            self.build.fast = true;
        }
        if other.build.no_cache {
            self.build.no_cache = true;
        }

        if other.pull.no_checksum {
            self.pull.no_checksum = true;
        }
        if other.pull.force_cache {
            self.pull.force_cache = true;
        }
    }

    /// Default package format, `auto` when unset.
    pub fn default_format(&self) -> &str {
        self.packmanager.default.as_deref().unwrap_or("auto")
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.ukbuild/config.toml)
/// 2. Global config (<home>/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the project config path (.ukbuild/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".ukbuild").join("config.toml")
}
