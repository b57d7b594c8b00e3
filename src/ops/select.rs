//! Target selection shared by building and packaging.

use crate::core::target::Target;
use crate::ops::errors::OpsError;

/// Architecture, platform and name criteria for picking targets.
///
/// Empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFilter {
    architecture: Option<String>,
    platform: Option<String>,
    target: Option<String>,
}

impl TargetFilter {
    /// A filter matching every target.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options(
        architecture: Option<String>,
        platform: Option<String>,
        target: Option<String>,
    ) -> Self {
        TargetFilter {
            architecture: non_empty(architecture),
            platform: non_empty(platform),
            target: non_empty(target),
        }
    }

    pub fn with_architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = non_empty(Some(architecture.into()));
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = non_empty(Some(platform.into()));
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = non_empty(Some(target.into()));
        self
    }

    pub fn architecture(&self) -> Option<&str> {
        self.architecture.as_deref()
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.architecture.is_none() && self.platform.is_none() && self.target.is_none()
    }

    /// Reject a target name combined with an architecture or platform.
    pub fn validate(&self) -> Result<(), OpsError> {
        if self.target.is_some() && (self.architecture.is_some() || self.platform.is_some()) {
            return Err(OpsError::usage(
                "the `--arch` and `--plat` options are not supported in addition to `--target`",
            ));
        }
        Ok(())
    }

    /// Whether `target` is selected.
    pub fn matches(&self, target: &Target) -> bool {
        let arch = target.architecture().name();
        let plat = target.platform().name();

        match (
            self.architecture.as_deref(),
            self.platform.as_deref(),
            self.target.as_deref(),
        ) {
            (None, None, None) => true,
            (_, _, Some(name)) if name == target.name() => true,
            (Some(a), None, None) => a == arch,
            (None, Some(p), None) => p == plat,
            (Some(a), Some(p), None) => a == arch && p == plat,
            _ => false,
        }
    }

    /// Selected targets, in their original order.
    pub fn select<'a>(&self, targets: &'a [Target]) -> Vec<&'a Target> {
        targets.iter().filter(|t| self.matches(t)).collect()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
