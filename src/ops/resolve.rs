//! Component resolution.
//!
//! Every declared component must resolve to exactly one package; no match
//! and several matches are both fatal.

use anyhow::{Context, Result};

use crate::core::component::Component;
use crate::ops::errors::OpsError;
use crate::packmanager::{CatalogQuery, Package, PackageManager, PullOptions, PullOutcome};
use crate::util::context::CancellationToken;

/// The catalog query issued for `component`.
pub fn component_query(component: &Component, no_cache: bool) -> CatalogQuery {
    CatalogQuery::new(component.name())
        .with_type(component.component_type())
        .with_version(component.version())
        .with_source(component.source())
        .with_no_cache(no_cache)
}

/// Resolve a single component to its package.
pub fn resolve_component(
    manager: &dyn PackageManager,
    component: &Component,
    no_cache: bool,
    cancel: &CancellationToken,
) -> Result<Box<dyn Package>> {
    cancel.check().map_err(OpsError::from)?;

    let query = component_query(component, no_cache);
    tracing::debug!("querying `{}` for {}", manager.format(), query);

    let mut found = manager
        .catalog(&query)
        .with_context(|| format!("failed to query catalog for {}", component))?;

    match found.len() {
        0 => Err(OpsError::ComponentNotFound {
            component: component.type_name_version(),
        }
        .into()),
        1 => Ok(found.remove(0)),
        count => Err(OpsError::AmbiguousComponent {
            component: component.type_name_version(),
            count,
        }
        .into()),
    }
}

/// Resolve every component before anything is pulled.
pub fn resolve_components(
    manager: &dyn PackageManager,
    components: &[Component],
    no_cache: bool,
    cancel: &CancellationToken,
) -> Result<Vec<Box<dyn Package>>> {
    components
        .iter()
        .map(|c| resolve_component(manager, c, no_cache, cancel))
        .collect()
}

/// Pull resolved packages in order, stopping at the first failure.
pub fn pull_packages(
    packages: &[Box<dyn Package>],
    options: &PullOptions,
) -> Result<Vec<PullOutcome>> {
    let mut outcomes = Vec::with_capacity(packages.len());
    for package in packages {
        options.cancel.check().map_err(OpsError::from)?;
        let outcome = package
            .pull(options)
            .with_context(|| format!("failed to pull {}", package.type_name_version()))?;
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::ComponentType;
    use crate::ops::errors::find_ops_error;
    use crate::test_support::{MockPackage, MockPackageManager};
    use tempfile::TempDir;

    fn musl() -> Component {
        Component::new("musl", ComponentType::Lib, "stable")
    }

    #[test]
    fn test_zero_matches_is_not_found() {
        let manager = MockPackageManager::new("oci");
        let err = resolve_component(&manager, &musl(), false, &CancellationToken::new())
            .err()
            .unwrap();

        match find_ops_error(&err) {
            Some(OpsError::ComponentNotFound { component }) => {
                assert_eq!(component, "lib/musl:stable")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_two_matches_is_ambiguous() {
        let manager = MockPackageManager::new("oci")
            .with_package(MockPackage::new("musl", ComponentType::Lib, "stable"))
            .with_package(MockPackage::new("musl", ComponentType::Lib, "stable"));

        let err = resolve_component(&manager, &musl(), false, &CancellationToken::new())
            .err()
            .unwrap();
        assert!(matches!(
            find_ops_error(&err),
            Some(OpsError::AmbiguousComponent { count: 2, .. })
        ));
    }

    #[test]
    fn test_single_match_is_queued_and_pulled() {
        let tmp = TempDir::new().unwrap();
        let manager = MockPackageManager::new("oci")
            .with_package(MockPackage::new("musl", ComponentType::Lib, "stable"))
            .with_package(MockPackage::new("lwip", ComponentType::Lib, "stable"));

        let packages =
            resolve_components(&manager, &[musl()], true, &CancellationToken::new()).unwrap();
        assert_eq!(packages.len(), 1);

        let queries = manager.queries();
        assert_eq!(queries[0].types(), &[ComponentType::Lib]);
        assert!(queries[0].no_cache());

        let outcomes = pull_packages(&packages, &PullOptions::new(tmp.path())).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(manager.pulled(), vec!["lib/musl:stable".to_string()]);
    }

    #[test]
    fn test_cancelled_before_query() {
        let manager = MockPackageManager::new("oci")
            .with_package(MockPackage::new("musl", ComponentType::Lib, "stable"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = resolve_component(&manager, &musl(), false, &cancel).err().unwrap();
        assert!(crate::ops::errors::is_cancelled(&err));
        assert!(manager.queries().is_empty());
    }
}
