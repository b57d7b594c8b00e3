//! Target definitions - what gets built.
//!
//! A Target is one buildable configuration of a project: an architecture and
//! platform pair together with its kconfig, kernel artifact and boot inputs.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::format::PackageFormat;

/// Kconfig key carrying the full kernel version string.
pub const UK_FULLVERSION: &str = "UK_FULLVERSION";

/// A reference to an architecture by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Architecture(String);

impl Architecture {
    pub fn new(name: impl Into<String>) -> Self {
        Architecture(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reference to a platform by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Platform(String);

impl Platform {
    pub fn new(name: impl Into<String>) -> Self {
        Platform(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single kconfig entry.
///
/// `value` is kept exactly as written, including any surrounding quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KConfigValue {
    pub key: String,
    pub value: String,
}

impl KConfigValue {
    /// The value with one pair of surrounding double quotes removed.
    pub fn unquoted(&self) -> &str {
        self.value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(&self.value)
    }
}

/// An ordered kconfig mapping.
///
/// Insertion order is preserved; setting an existing key replaces its value
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct KConfig {
    values: Vec<KConfigValue>,
}

impl KConfig {
    pub fn new() -> Self {
        KConfig { values: Vec::new() }
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&KConfigValue> {
        self.values.iter().find(|v| v.key == key)
    }

    /// Set a key, replacing any existing value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.values.iter_mut().find(|v| v.key == key) {
            Some(existing) => existing.value = value,
            None => self.values.push(KConfigValue { key, value }),
        }
    }

    /// Builder-style [`KConfig::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Overlay `other` on top of this mapping.
    pub fn merge(&mut self, other: &KConfig) {
        for v in &other.values {
            self.set(v.key.clone(), v.value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &KConfigValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a single `KEY=VALUE` assignment.
    pub fn parse_assignment(line: &str) -> Result<KConfigValue, String> {
        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(KConfigValue {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
            }),
            _ => Err(format!("invalid kconfig assignment `{}`", line)),
        }
    }

    /// Parse the contents of a `.config` file.
    ///
    /// Comments and blank lines are skipped; `# CONFIG_X is not set` lines are
    /// kept as `CONFIG_X=n`.
    pub fn parse_dotconfig(contents: &str) -> Result<Self, String> {
        let mut kconfig = KConfig::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix("# ") {
                if let Some(key) = rest.strip_suffix(" is not set") {
                    kconfig.set(key.trim(), "n");
                }
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            let value = Self::parse_assignment(line)?;
            kconfig.set(value.key, value.value);
        }
        Ok(kconfig)
    }

    /// Render as `.config` contents.
    pub fn to_dotconfig(&self) -> String {
        let mut out = String::new();
        for v in &self.values {
            if v.value == "n" {
                out.push_str(&format!("# {} is not set\n", v.key));
            } else {
                out.push_str(&format!("{}={}\n", v.key, v.value));
            }
        }
        out
    }
}

impl TryFrom<Vec<String>> for KConfig {
    type Error = String;

    fn try_from(lines: Vec<String>) -> Result<Self, Self::Error> {
        let mut kconfig = KConfig::new();
        for line in &lines {
            let value = KConfig::parse_assignment(line)?;
            kconfig.set(value.key, value.value);
        }
        Ok(kconfig)
    }
}

impl From<KConfig> for Vec<String> {
    fn from(kconfig: KConfig) -> Self {
        kconfig
            .values
            .into_iter()
            .map(|v| format!("{}={}", v.key, v.value))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut kconfig = KConfig::new();
        for (k, v) in iter {
            kconfig.set(k, v);
        }
        kconfig
    }
}

/// A build target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    name: String,
    architecture: Architecture,
    platform: Platform,
    kernel: PathBuf,
    kernel_dbg: bool,
    kconfig: KConfig,
    initrd: Option<PathBuf>,
    command: Vec<String>,
    format: PackageFormat,
}

impl Target {
    /// Create a target with an empty kconfig and no kernel path.
    pub fn new(name: impl Into<String>, architecture: Architecture, platform: Platform) -> Self {
        Target {
            name: name.into(),
            architecture,
            platform,
            kernel: PathBuf::new(),
            kernel_dbg: false,
            kconfig: KConfig::new(),
            initrd: None,
            command: Vec::new(),
            format: PackageFormat::default(),
        }
    }

    pub fn with_kernel(mut self, kernel: impl Into<PathBuf>) -> Self {
        self.kernel = kernel.into();
        self
    }

    pub fn with_kernel_dbg(mut self, kernel_dbg: bool) -> Self {
        self.kernel_dbg = kernel_dbg;
        self
    }

    pub fn with_kconfig(mut self, kconfig: KConfig) -> Self {
        self.kconfig = kconfig;
        self
    }

    pub fn with_initrd(mut self, initrd: Option<PathBuf>) -> Self {
        self.initrd = initrd;
        self
    }

    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    pub fn with_format(mut self, format: impl Into<PackageFormat>) -> Self {
        self.format = format.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Path of the kernel image this target produces.
    pub fn kernel(&self) -> &Path {
        &self.kernel
    }

    /// Path of the unstripped kernel image.
    pub fn kernel_dbg_path(&self) -> PathBuf {
        let mut path = self.kernel.clone().into_os_string();
        path.push(".dbg");
        PathBuf::from(path)
    }

    pub fn kernel_dbg(&self) -> bool {
        self.kernel_dbg
    }

    pub fn kconfig(&self) -> &KConfig {
        &self.kconfig
    }

    pub fn initrd(&self) -> Option<&Path> {
        self.initrd.as_deref()
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Declared package format; empty when the target does not declare one.
    pub fn format(&self) -> &PackageFormat {
        &self.format
    }

    /// `<platform>-<architecture>`.
    pub fn plat_arch_name(&self) -> String {
        format!("{}-{}", self.platform, self.architecture)
    }

    /// A copy carrying only what packaging needs, optionally renamed.
    ///
    /// An empty `name` keeps the current target name.
    pub fn packaging_snapshot(&self, name: &str) -> Target {
        let name = if name.is_empty() { &self.name } else { name };
        Target::new(name, self.architecture.clone(), self.platform.clone())
            .with_kconfig(self.kconfig.clone())
            .with_kernel(self.kernel.clone())
            .with_kernel_dbg(self.kernel_dbg)
            .with_initrd(self.initrd.clone())
            .with_command(self.command.clone())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.plat_arch_name())
    }
}
