//! High-level operations.
//!
//! This module contains the implementation of ukbuild commands.

pub mod errors;
pub mod resolve;
pub mod select;
pub mod ukbuild_build;
pub mod ukbuild_clean;
pub mod ukbuild_pkg;
pub mod ukbuild_pull;
pub mod ukbuild_set;
pub mod ukbuild_source;

pub use errors::{find_ops_error, is_cancelled, OpsError};
pub use resolve::{pull_packages, resolve_component, resolve_components};
pub use select::TargetFilter;
pub use ukbuild_build::{build, BuildOptions, BuildReport, FailurePolicy, TargetOutcome};
pub use ukbuild_clean::properclean;
pub use ukbuild_pkg::{package, PackageOptions, PackageReport, PackagedTarget};
pub use ukbuild_pull::{pull, PullOptions, PullReport, PulledPackage, Skipped};
pub use ukbuild_set::set;
pub use ukbuild_source::{source, unsource, update};
