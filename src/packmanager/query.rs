//! Catalog queries.

use std::fmt;

use crate::core::component::{type_name_version, ComponentType};

/// A request for packages from a catalog.
///
/// An empty `types` set, `version` or `source` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    name: String,
    types: Vec<ComponentType>,
    version: String,
    source: String,
    no_cache: bool,
}

impl CatalogQuery {
    /// Query packages by name.
    pub fn new(name: impl Into<String>) -> Self {
        CatalogQuery {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Restrict to a single component type.
    pub fn with_type(mut self, component_type: ComponentType) -> Self {
        if !self.types.contains(&component_type) {
            self.types.push(component_type);
        }
        self
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = ComponentType>) -> Self {
        for t in types {
            self = self.with_type(t);
        }
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Bypass any cached catalog data.
    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> &[ComponentType] {
        &self.types
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn no_cache(&self) -> bool {
        self.no_cache
    }

    /// Check a catalog entry against the name, types and version of this query.
    pub fn matches(&self, name: &str, component_type: ComponentType, version: &str) -> bool {
        self.name == name
            && (self.types.is_empty() || self.types.contains(&component_type))
            && (self.version.is_empty() || self.version == version)
    }
}

impl fmt::Display for CatalogQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.types.as_slice() {
            [single] => f.write_str(&type_name_version(*single, &self.name, &self.version)),
            _ if self.version.is_empty() => f.write_str(&self.name),
            _ => write!(f, "{}:{}", self.name, self.version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches() {
        let query = CatalogQuery::new("musl")
            .with_type(ComponentType::Lib)
            .with_version("stable");

        assert!(query.matches("musl", ComponentType::Lib, "stable"));
        assert!(!query.matches("musl", ComponentType::Lib, "0.16"));
        assert!(!query.matches("musl", ComponentType::App, "stable"));
        assert!(!query.matches("lwip", ComponentType::Lib, "stable"));
    }

    #[test]
    fn test_name_only_matches_any_type_and_version() {
        let query = CatalogQuery::new("musl");
        assert!(query.matches("musl", ComponentType::Lib, "0.16"));
        assert!(query.matches("musl", ComponentType::App, ""));
    }

    #[test]
    fn test_display() {
        let typed = CatalogQuery::new("helloworld")
            .with_type(ComponentType::App)
            .with_version("stable");
        assert_eq!(typed.to_string(), "app/helloworld:stable");
        assert_eq!(CatalogQuery::new("musl").to_string(), "musl");
    }
}
