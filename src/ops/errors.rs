//! Errors raised by the build, package and pull operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::builder::events::Stage;
use crate::core::project::ProjectError;
use crate::packmanager::router::RouteError;
use crate::util::context::Cancelled;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Typed failures of the high-level operations.
///
/// Operations return `anyhow::Result`; callers that need to react to a
/// specific failure use `downcast_ref::<OpsError>()`.
#[derive(Debug, Error)]
pub enum OpsError {
    /// Mutually exclusive options were combined.
    #[error("{message}")]
    UsageConflict { message: String },

    #[error("could not find: {component}")]
    ComponentNotFound { component: String },

    #[error("too many options for {component} ({count} packages match)")]
    AmbiguousComponent { component: String, count: usize },

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("no targets selected to {action}")]
    NoTargetsSelected { action: &'static str },

    /// A stage failed for one target.
    #[error("could not {stage} {target}: {message}")]
    Stage {
        stage: Stage,
        target: String,
        message: String,
    },

    #[error("dotconfig file does not exist: {}", path.display())]
    MissingDotConfig { path: PathBuf },

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl OpsError {
    pub fn usage(message: impl Into<String>) -> Self {
        OpsError::UsageConflict {
            message: message.into(),
        }
    }

    /// The target a stage error is attributed to.
    pub fn target(&self) -> Option<&str> {
        match self {
            OpsError::Stage { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Render as a user-facing diagnostic with next steps.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            OpsError::UsageConflict { .. } => diag.with_suggestion(suggestions::TARGET_OR_ARCH),
            OpsError::ComponentNotFound { .. } => diag
                .with_suggestion(suggestions::UPDATE_SOURCES)
                .with_suggestion(suggestions::ADD_SOURCE),
            OpsError::AmbiguousComponent { .. } => {
                diag.with_suggestion("pin an exact version or source for the component")
            }
            OpsError::Route(RouteError::UnsupportedFormat { .. }) => {
                diag.with_suggestion("pass --format auto to use the default package manager")
            }
            OpsError::Route(RouteError::IncompatibleSource { .. }) => {
                diag.with_suggestion(suggestions::ADD_SOURCE)
            }
            OpsError::Route(RouteError::NoDefault) => diag,
            OpsError::NoTargetsSelected { .. } => diag.with_suggestion(suggestions::LIST_TARGETS),
            OpsError::Stage { .. } => diag.with_suggestion(suggestions::BUILD_FAILED),
            OpsError::MissingDotConfig { path } => diag
                .with_location(path.clone())
                .with_suggestion("run `ukbuild build` to configure the project first"),
            OpsError::Project(ProjectError::Uninitialized { workdir }) => diag
                .with_location(workdir.clone())
                .with_suggestion(suggestions::NO_MANIFEST),
            OpsError::Project(ProjectError::TemplateNotMaterialized { .. }) => {
                diag.with_suggestion(suggestions::PULL_TEMPLATE)
            }
            OpsError::Project(ProjectError::Manifest(_)) => diag,
            OpsError::Cancelled(_) => diag,
        }
    }
}

/// Whether `err` carries a cancellation, directly or wrapped.
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause.downcast_ref::<Cancelled>().is_some()
            || matches!(cause.downcast_ref::<OpsError>(), Some(OpsError::Cancelled(_)))
    })
}

/// Find a typed operation error anywhere in `err`'s chain.
pub fn find_ops_error(err: &anyhow::Error) -> Option<&OpsError> {
    err.chain().find_map(|cause| cause.downcast_ref::<OpsError>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_diagnostic() {
        let err = OpsError::ComponentNotFound {
            component: "lib/musl:stable".to_string(),
        };
        let output = err.to_diagnostic().format(false);

        assert!(output.starts_with("error: could not find: lib/musl:stable"));
        assert!(output.contains("ukbuild update"));
    }

    #[test]
    fn test_is_cancelled_through_context() {
        let err = anyhow::Error::new(Cancelled).context("failed to pull lib/musl");
        assert!(is_cancelled(&err));

        let other = anyhow::anyhow!("boom");
        assert!(!is_cancelled(&other));
    }

    #[test]
    fn test_find_ops_error_through_context() {
        let err = anyhow::Error::new(OpsError::NoTargetsSelected { action: "build" })
            .context("while building hello");
        assert!(matches!(
            find_ops_error(&err),
            Some(OpsError::NoTargetsSelected { .. })
        ));
    }
}
