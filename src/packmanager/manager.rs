//! PackageManager trait definition.
//!
//! A package manager is a backend identified by its format string. It
//! answers catalog queries, produces packages from built targets and
//! manages the sources it reads from.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::format::PackageFormat;
use crate::core::target::Target;
use crate::packmanager::package::Package;
use crate::packmanager::query::CatalogQuery;
use crate::util::context::CancellationToken;

/// Options passed to [`PackageManager::pack`].
#[derive(Debug, Clone, Default)]
pub struct PackOptions {
    /// Include the target kconfig in the package
    pub kconfig: bool,

    /// Output location; the backend picks one when unset
    pub output: Option<PathBuf>,

    /// Initramfs to include, overriding the target's
    pub initrd: Option<PathBuf>,

    /// Kernel version hint taken from `UK_FULLVERSION`
    pub kernel_version: Option<String>,

    /// Overwrite an existing output
    pub force: bool,

    pub cancel: CancellationToken,
}

/// A pluggable catalog, pull and pack backend.
///
/// Implementations are shared between operations and must be usable
/// through a shared reference.
pub trait PackageManager: Send + Sync {
    /// The format string this backend registers under.
    fn format(&self) -> PackageFormat;

    /// Find packages matching `query`.
    fn catalog(&self, query: &CatalogQuery) -> Result<Vec<Box<dyn Package>>>;

    /// Package a built target.
    fn pack(&self, target: &Target, options: &PackOptions) -> Result<Box<dyn Package>>;

    /// Register a source locator.
    fn add_source(&self, source: &str) -> Result<()>;

    /// Forget a source locator.
    fn remove_source(&self, source: &str) -> Result<()>;

    /// Refresh cached catalog data.
    fn update(&self) -> Result<()>;

    /// Whether this backend can handle `locator`.
    fn is_compatible(&self, locator: &str) -> Result<bool>;
}
