//! Package manager router - maps format strings to backends.
//!
//! The router is built once at startup, then shared read-only by every
//! operation that needs a backend. There is no ambient "current" backend:
//! callers pass the router (and through it the default) explicitly.

use std::sync::Arc;

use thiserror::Error;

use crate::core::format::PackageFormat;
use crate::packmanager::local::LocalManager;
use crate::packmanager::manager::PackageManager;
use crate::util::config::Config;
use crate::util::context::GlobalContext;

/// Errors raised while choosing a backend.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("unsupported package format `{format}`")]
    UnsupportedFormat { format: String },

    #[error("incompatible package manager for `{locator}`")]
    IncompatibleSource { locator: String },

    #[error("no default package manager is registered")]
    NoDefault,
}

/// Registry of package managers keyed by format.
#[derive(Clone, Default)]
pub struct PackageManagers {
    managers: Vec<Arc<dyn PackageManager>>,
    default: Option<PackageFormat>,
}

impl PackageManagers {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in backends.
    ///
    /// The default backend comes from `[packmanager] default` and falls back
    /// to the first registered backend.
    pub fn with_builtin(ctx: &GlobalContext, config: &Config) -> Result<Self, RouteError> {
        let mut managers = PackageManagers::new();
        managers.register(Arc::new(LocalManager::from_context(ctx)));

        let configured = PackageFormat::from(config.default_format());
        if !configured.is_auto() {
            managers.set_default(configured)?;
        }

        Ok(managers)
    }

    /// Register a backend, replacing any backend with the same format.
    ///
    /// The first backend registered becomes the default.
    pub fn register(&mut self, manager: Arc<dyn PackageManager>) {
        let format = manager.format();
        tracing::debug!("registering package manager `{}`", format);

        if self.default.is_none() {
            self.default = Some(format.clone());
        }

        match self.managers.iter_mut().find(|m| m.format() == format) {
            Some(existing) => *existing = manager,
            None => self.managers.push(manager),
        }
    }

    /// Make the backend registered under `format` the default.
    pub fn set_default(&mut self, format: PackageFormat) -> Result<(), RouteError> {
        if !self.contains(&format) {
            return Err(RouteError::UnsupportedFormat {
                format: format.to_string(),
            });
        }
        self.default = Some(format);
        Ok(())
    }

    /// The default backend.
    pub fn default_manager(&self) -> Result<Arc<dyn PackageManager>, RouteError> {
        let format = self.default.as_ref().ok_or(RouteError::NoDefault)?;
        self.from(format)
    }

    /// Pick a backend for `format`; `auto` and the empty format pick the default.
    pub fn route(&self, format: &PackageFormat) -> Result<Arc<dyn PackageManager>, RouteError> {
        if format.is_auto() {
            self.default_manager()
        } else {
            self.from(format)
        }
    }

    /// The backend registered under exactly `format`.
    pub fn from(&self, format: &PackageFormat) -> Result<Arc<dyn PackageManager>, RouteError> {
        self.managers
            .iter()
            .find(|m| &m.format() == format)
            .cloned()
            .ok_or_else(|| RouteError::UnsupportedFormat {
                format: format.to_string(),
            })
    }

    /// Find the first backend, in registration order, that claims `locator`.
    ///
    /// Backends that fail while probing are treated as not compatible.
    pub fn probe(&self, locator: &str) -> Option<Arc<dyn PackageManager>> {
        for manager in &self.managers {
            match manager.is_compatible(locator) {
                Ok(true) => {
                    tracing::debug!("`{}` claimed by `{}`", locator, manager.format());
                    return Some(Arc::clone(manager));
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!("`{}` failed to probe `{}`: {:#}", manager.format(), locator, e);
                }
            }
        }
        None
    }

    /// Like [`PackageManagers::probe`] but failing when nothing claims `locator`.
    pub fn probe_required(&self, locator: &str) -> Result<Arc<dyn PackageManager>, RouteError> {
        self.probe(locator)
            .ok_or_else(|| RouteError::IncompatibleSource {
                locator: locator.to_string(),
            })
    }

    /// Registered formats in registration order.
    pub fn formats(&self) -> impl Iterator<Item = PackageFormat> + '_ {
        self.managers.iter().map(|m| m.format())
    }

    pub fn contains(&self, format: &PackageFormat) -> bool {
        self.managers.iter().any(|m| &m.format() == format)
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockPackageManager;

    fn registry() -> PackageManagers {
        let mut managers = PackageManagers::new();
        managers.register(Arc::new(MockPackageManager::new("oci").with_compatible("unikraft.org")));
        managers.register(Arc::new(MockPackageManager::new("raw").with_compatible("/tmp/catalog")));
        managers
    }

    #[test]
    fn test_auto_routes_to_default() {
        let managers = registry();

        assert_eq!(managers.route(&PackageFormat::auto()).unwrap().format().as_str(), "oci");
        assert_eq!(managers.route(&PackageFormat::default()).unwrap().format().as_str(), "oci");
        assert_eq!(managers.route(&"raw".into()).unwrap().format().as_str(), "raw");
    }

    #[test]
    fn test_unknown_format() {
        let err = registry().route(&"qcow2".into()).err().unwrap();
        assert_eq!(
            err,
            RouteError::UnsupportedFormat {
                format: "qcow2".to_string()
            }
        );
    }

    #[test]
    fn test_set_default() {
        let mut managers = registry();
        managers.set_default("raw".into()).unwrap();
        assert_eq!(managers.route(&PackageFormat::auto()).unwrap().format().as_str(), "raw");

        assert!(managers.set_default("qcow2".into()).is_err());
    }

    #[test]
    fn test_probe() {
        let managers = registry();

        assert_eq!(managers.probe("/tmp/catalog").unwrap().format().as_str(), "raw");
        assert!(managers.probe("nowhere").is_none());
        assert!(matches!(
            managers.probe_required("nowhere"),
            Err(RouteError::IncompatibleSource { .. })
        ));
    }

    #[test]
    fn test_register_replaces_same_format() {
        let mut managers = registry();
        managers.register(Arc::new(MockPackageManager::new("raw")));

        assert_eq!(managers.len(), 2);
        assert!(managers.probe("/tmp/catalog").is_none());
    }

    #[test]
    fn test_empty_registry_has_no_default() {
        let managers = PackageManagers::new();
        assert_eq!(managers.route(&PackageFormat::auto()).err(), Some(RouteError::NoDefault));
    }
}
