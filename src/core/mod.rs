//! Core data structures for ukbuild.
//!
//! This module contains the foundational types used throughout ukbuild:
//! - Build targets and their kconfig
//! - Components and where they are materialized
//! - Kraftfile manifests and loaded projects

pub mod component;
pub mod format;
pub mod manifest;
pub mod project;
pub mod target;

pub use component::{Component, ComponentType};
pub use format::PackageFormat;
pub use manifest::{find_manifest, Manifest, ManifestError, MANIFEST_ALIAS, MANIFEST_NAME};
pub use project::{Project, ProjectError};
pub use target::{Architecture, KConfig, Platform, Target};
