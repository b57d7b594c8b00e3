//! Package format identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A package format string such as `local`, `oci` or `raw`.
///
/// The special value `auto` (or an empty string) means "let the router
/// decide".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageFormat(String);

impl PackageFormat {
    pub const AUTO: &'static str = "auto";

    pub fn new(format: impl Into<String>) -> Self {
        PackageFormat(format.into())
    }

    pub fn auto() -> Self {
        PackageFormat(Self::AUTO.to_string())
    }

    /// True for `auto` and for the empty format.
    pub fn is_auto(&self) -> bool {
        self.0.is_empty() || self.0 == Self::AUTO
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageFormat {
    fn from(s: &str) -> Self {
        PackageFormat(s.to_string())
    }
}

impl From<String> for PackageFormat {
    fn from(s: String) -> Self {
        PackageFormat(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_detection() {
        assert!(PackageFormat::auto().is_auto());
        assert!(PackageFormat::default().is_auto());
        assert!(!PackageFormat::from("raw").is_auto());
    }
}
