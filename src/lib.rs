//! ukbuild - build and package unikernel projects
//!
//! This crate provides the library behind the `ukbuild` binary: project
//! loading, component resolution through pluggable package managers, the
//! staged build pipeline and kernel packaging.

pub mod builder;
pub mod core;
pub mod ops;
pub mod packmanager;
pub mod util;

/// Test doubles for ukbuild unit tests.
///
/// Only compiled for tests. Provides in-memory package managers, a
/// recording build driver and a recording stage observer.
#[cfg(test)]
pub mod test_support;

pub use core::{
    component::Component, format::PackageFormat, manifest::Manifest, project::Project,
    target::Target,
};

pub use util::context::GlobalContext;
