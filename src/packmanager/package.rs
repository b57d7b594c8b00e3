//! Package handles returned by catalogs.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::component::{place_component, type_name_version, ComponentType};
use crate::core::format::PackageFormat;
use crate::util::context::CancellationToken;

/// Options for materializing a package into a project.
#[derive(Debug, Clone)]
pub struct PullOptions {
    /// Project working directory the package is placed into
    pub workdir: PathBuf,

    /// Verify the package checksum before it is moved into place
    pub checksum: bool,

    /// Reuse an already materialized copy whose checksum matches
    pub cache: bool,

    pub cancel: CancellationToken,
}

impl PullOptions {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        PullOptions {
            workdir: workdir.into(),
            checksum: true,
            cache: true,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_checksum(mut self, checksum: bool) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// What a pull did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The package was copied into place.
    Pulled(PathBuf),

    /// A matching copy was already present; nothing was written.
    UpToDate(PathBuf),
}

impl PullOutcome {
    /// Where the package now lives.
    pub fn path(&self) -> &Path {
        match self {
            PullOutcome::Pulled(path) | PullOutcome::UpToDate(path) => path,
        }
    }

    pub fn is_up_to_date(&self) -> bool {
        matches!(self, PullOutcome::UpToDate(_))
    }
}

/// An opaque package handle produced by a [`PackageManager`].
///
/// [`PackageManager`]: crate::packmanager::PackageManager
pub trait Package: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn component_type(&self) -> ComponentType;

    fn version(&self) -> &str;

    /// Format of the backend that produced this package.
    fn format(&self) -> PackageFormat;

    /// Content checksum, when the backend knows one.
    fn checksum(&self) -> Option<&str>;

    /// Materialize the package inside `options.workdir`.
    fn pull(&self, options: &PullOptions) -> Result<PullOutcome>;

    /// `type/name:version`.
    fn type_name_version(&self) -> String {
        type_name_version(self.component_type(), self.name(), self.version())
    }

    /// Where [`Package::pull`] places this package inside `workdir`.
    fn placement(&self, workdir: &Path) -> PathBuf {
        place_component(workdir, self.component_type(), self.name())
    }
}
