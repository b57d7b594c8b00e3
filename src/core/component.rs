//! Components - the named, versioned dependency units a project declares.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Directory inside a workdir where components are materialized.
pub const VENDOR_DIR: &str = ".unikraft";

/// The kind of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    /// The unikernel core sources
    Core,

    /// An architecture port
    #[serde(alias = "architecture")]
    Arch,

    /// A platform port
    #[serde(alias = "platform")]
    Plat,

    /// A library
    #[serde(alias = "library")]
    Lib,

    /// An application (also used for templates)
    #[serde(alias = "application")]
    App,

    /// Anything a catalog could not classify
    Unknown,
}

impl ComponentType {
    /// Short name used in `type/name:version` strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Core => "core",
            ComponentType::Arch => "arch",
            ComponentType::Plat => "plat",
            ComponentType::Lib => "lib",
            ComponentType::App => "app",
            ComponentType::Unknown => "unknown",
        }
    }

    /// Plural directory name used in vendor and catalog layouts.
    pub fn plural(&self) -> &'static str {
        match self {
            ComponentType::Core => "unikraft",
            ComponentType::Arch => "archs",
            ComponentType::Plat => "plats",
            ComponentType::Lib => "libs",
            ComponentType::App => "apps",
            ComponentType::Unknown => "unknown",
        }
    }

    /// All types a catalog may hold, in layout order.
    pub fn all() -> [ComponentType; 5] {
        [
            ComponentType::Core,
            ComponentType::Arch,
            ComponentType::Plat,
            ComponentType::Lib,
            ComponentType::App,
        ]
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "core" | "unikraft" => Ok(ComponentType::Core),
            "arch" | "architecture" => Ok(ComponentType::Arch),
            "plat" | "platform" => Ok(ComponentType::Plat),
            "lib" | "library" => Ok(ComponentType::Lib),
            "app" | "application" => Ok(ComponentType::App),
            _ => Err(format!(
                "invalid component type '{}'; expected one of core, arch, plat, lib, app",
                s
            )),
        }
    }
}

/// A component declared by a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Component {
    name: String,
    component_type: ComponentType,
    version: String,
    source: String,
}

impl Component {
    /// Create a component with no explicit source.
    pub fn new(
        name: impl Into<String>,
        component_type: ComponentType,
        version: impl Into<String>,
    ) -> Self {
        Component {
            name: name.into(),
            component_type,
            version: version.into(),
            source: String::new(),
        }
    }

    /// Set the origin locator.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Origin locator; empty when the component came from a default source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// `type/name:version`, the identity used in user-facing messages.
    pub fn type_name_version(&self) -> String {
        type_name_version(self.component_type, &self.name, &self.version)
    }

    /// Where this component is materialized inside `workdir`.
    pub fn placement(&self, workdir: &Path) -> PathBuf {
        place_component(workdir, self.component_type, &self.name)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name_version())
    }
}

/// Format a component identity as `type/name:version`.
///
/// The `:version` suffix is dropped when the version is empty.
pub fn type_name_version(component_type: ComponentType, name: &str, version: &str) -> String {
    if version.is_empty() {
        format!("{}/{}", component_type, name)
    } else {
        format!("{}/{}:{}", component_type, name, version)
    }
}

/// Path inside `workdir` where a component of the given type and name lives.
pub fn place_component(workdir: &Path, component_type: ComponentType, name: &str) -> PathBuf {
    let vendor = workdir.join(VENDOR_DIR);
    match component_type {
        ComponentType::Core => vendor.join(ComponentType::Core.plural()),
        other => vendor.join(other.plural()).join(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_version() {
        let c = Component::new("musl", ComponentType::Lib, "stable");
        assert_eq!(c.type_name_version(), "lib/musl:stable");

        let unversioned = Component::new("lwip", ComponentType::Lib, "");
        assert_eq!(unversioned.to_string(), "lib/lwip");
    }

    #[test]
    fn test_component_type_parse() {
        assert_eq!("library".parse::<ComponentType>().unwrap(), ComponentType::Lib);
        assert_eq!("APP".parse::<ComponentType>().unwrap(), ComponentType::App);
        assert!("kernel".parse::<ComponentType>().is_err());
    }

    #[test]
    fn test_place_component() {
        let workdir = Path::new("/work/hello");
        assert_eq!(
            place_component(workdir, ComponentType::Core, "unikraft"),
            PathBuf::from("/work/hello/.unikraft/unikraft")
        );
        assert_eq!(
            place_component(workdir, ComponentType::App, "helloworld"),
            PathBuf::from("/work/hello/.unikraft/apps/helloworld")
        );
    }
}
