//! Test doubles for ukbuild unit tests.
//!
//! In-memory package managers, a recording build driver and a recording
//! stage observer, so operations can be exercised without `make` or a
//! real catalog.
//!
//! # Example
//!
//! ```rust,ignore
//! use ukbuild::test_support::{MockPackage, MockPackageManager};
//!
//! let manager = MockPackageManager::new("oci")
//!     .with_package(MockPackage::new("musl", ComponentType::Lib, "stable"));
//! ```

pub mod fixtures;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};

use crate::builder::driver::{BuildDriver, ConfigureOptions, Jobs, MakeOptions};
use crate::builder::events::{Stage, StageEvent, StageObserver};
use crate::core::component::ComponentType;
use crate::core::format::PackageFormat;
use crate::core::project::Project;
use crate::core::target::{KConfig, Target};
use crate::packmanager::{
    CatalogQuery, PackOptions, Package, PackageManager, PullOptions, PullOutcome,
};
use crate::util::fs;

type Log<T> = Arc<Mutex<Vec<T>>>;

fn snapshot<T: Clone>(log: &Log<T>) -> Vec<T> {
    log.lock().map(|l| l.clone()).unwrap_or_default()
}

fn record<T>(log: &Log<T>, value: T) {
    if let Ok(mut l) = log.lock() {
        l.push(value);
    }
}

/// A package whose pull writes a fixed set of files.
#[derive(Debug, Clone)]
pub struct MockPackage {
    name: String,
    component_type: ComponentType,
    version: String,
    format: PackageFormat,
    files: Vec<(PathBuf, String)>,
    pulled: Log<String>,
}

impl MockPackage {
    pub fn new(name: &str, component_type: ComponentType, version: &str) -> Self {
        MockPackage {
            name: name.to_string(),
            component_type,
            version: version.to_string(),
            format: PackageFormat::from("mock"),
            files: Vec::new(),
            pulled: Arc::default(),
        }
    }

    /// Write `contents` at `rel` inside the placement when pulled.
    pub fn with_file(mut self, rel: &str, contents: &str) -> Self {
        self.files.push((PathBuf::from(rel), contents.to_string()));
        self
    }

    fn owned_by(mut self, format: PackageFormat, pulled: Log<String>) -> Self {
        self.format = format;
        self.pulled = pulled;
        self
    }
}

impl Package for MockPackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn component_type(&self) -> ComponentType {
        self.component_type
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn format(&self) -> PackageFormat {
        self.format.clone()
    }

    fn checksum(&self) -> Option<&str> {
        None
    }

    fn pull(&self, options: &PullOptions) -> Result<PullOutcome> {
        options.cancel.check()?;

        let dest = self.placement(&options.workdir);
        fs::ensure_dir(&dest)?;
        for (rel, contents) in &self.files {
            fs::write_string(&dest.join(rel), contents)?;
        }

        record(&self.pulled, self.type_name_version());
        Ok(PullOutcome::Pulled(dest))
    }
}

/// An in-memory package manager that records every call.
#[derive(Debug)]
pub struct MockPackageManager {
    format: PackageFormat,
    packages: Vec<MockPackage>,
    compatible: HashSet<String>,
    failing_queries: HashSet<String>,
    failing_pack: bool,
    queries: Log<CatalogQuery>,
    pulled: Log<String>,
    packed: Log<(Target, PackOptions)>,
    sources: Log<String>,
    updates: Log<()>,
}

impl MockPackageManager {
    pub fn new(format: &str) -> Self {
        MockPackageManager {
            format: PackageFormat::from(format),
            packages: Vec::new(),
            compatible: HashSet::new(),
            failing_queries: HashSet::new(),
            failing_pack: false,
            queries: Arc::default(),
            pulled: Arc::default(),
            packed: Arc::default(),
            sources: Arc::default(),
            updates: Arc::default(),
        }
    }

    pub fn with_package(mut self, package: MockPackage) -> Self {
        let package = package.owned_by(self.format.clone(), self.pulled.clone());
        self.packages.push(package);
        self
    }

    /// Claim `locator` in [`PackageManager::is_compatible`].
    pub fn with_compatible(mut self, locator: &str) -> Self {
        self.compatible.insert(locator.to_string());
        self
    }

    /// Fail catalog queries for `name`.
    pub fn with_failing_query(mut self, name: &str) -> Self {
        self.failing_queries.insert(name.to_string());
        self
    }

    pub fn failing_pack(mut self) -> Self {
        self.failing_pack = true;
        self
    }

    pub fn queries(&self) -> Vec<CatalogQuery> {
        snapshot(&self.queries)
    }

    /// `type/name:version` of every package pulled, in order.
    pub fn pulled(&self) -> Vec<String> {
        snapshot(&self.pulled)
    }

    pub fn packed(&self) -> Vec<(Target, PackOptions)> {
        snapshot(&self.packed)
    }

    /// Currently registered sources.
    pub fn sources(&self) -> Vec<String> {
        snapshot(&self.sources)
    }

    pub fn updates(&self) -> usize {
        snapshot(&self.updates).len()
    }
}

impl PackageManager for MockPackageManager {
    fn format(&self) -> PackageFormat {
        self.format.clone()
    }

    fn catalog(&self, query: &CatalogQuery) -> Result<Vec<Box<dyn Package>>> {
        record(&self.queries, query.clone());

        if self.failing_queries.contains(query.name()) {
            bail!("catalog unavailable for {}", query.name());
        }

        Ok(self
            .packages
            .iter()
            .filter(|p| query.matches(&p.name, p.component_type, &p.version))
            .map(|p| Box::new(p.clone()) as Box<dyn Package>)
            .collect())
    }

    fn pack(&self, target: &Target, options: &PackOptions) -> Result<Box<dyn Package>> {
        options.cancel.check()?;
        if self.failing_pack {
            bail!("packing {} failed", target.name());
        }

        record(&self.packed, (target.clone(), options.clone()));
        let package = MockPackage::new(target.name(), ComponentType::App, "latest")
            .owned_by(self.format.clone(), self.pulled.clone());
        Ok(Box::new(package))
    }

    fn add_source(&self, source: &str) -> Result<()> {
        record(&self.sources, source.to_string());
        Ok(())
    }

    fn remove_source(&self, source: &str) -> Result<()> {
        if let Ok(mut sources) = self.sources.lock() {
            sources.retain(|s| s != source);
        }
        Ok(())
    }

    fn update(&self) -> Result<()> {
        record(&self.updates, ());
        Ok(())
    }

    fn is_compatible(&self, locator: &str) -> Result<bool> {
        Ok(self.compatible.contains(locator))
    }
}

/// A build driver recording `"<stage> <target>"` for every call.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    failing: Option<(Stage, String)>,
    calls: Log<String>,
    configured: Log<KConfig>,
    jobs: Log<Jobs>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `stage` for the target named `target`.
    pub fn failing(mut self, stage: Stage, target: &str) -> Self {
        self.failing = Some((stage, target.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        snapshot(&self.calls)
    }

    /// Effective kconfig of the last configure call.
    pub fn last_configure(&self) -> Option<KConfig> {
        snapshot(&self.configured).pop()
    }

    pub fn last_jobs(&self) -> Option<Jobs> {
        snapshot(&self.jobs).pop()
    }

    fn run(&self, stage: Stage, name: &str) -> Result<()> {
        record(&self.calls, format!("{} {}", stage, name));
        match &self.failing {
            Some((s, t)) if *s == stage && t == name => bail!("{} failed for {}", stage, name),
            _ => Ok(()),
        }
    }
}

impl BuildDriver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    fn configure(&self, _project: &Project, target: &Target, options: &ConfigureOptions) -> Result<()> {
        let mut kconfig = target.kconfig().clone();
        kconfig.merge(&options.extra);
        record(&self.configured, kconfig);
        self.run(Stage::Configure, target.name())
    }

    fn prepare(&self, _project: &Project, target: &Target, options: &MakeOptions) -> Result<()> {
        record(&self.jobs, options.jobs);
        self.run(Stage::Prepare, target.name())
    }

    fn build(&self, _project: &Project, target: &Target, options: &MakeOptions) -> Result<()> {
        record(&self.jobs, options.jobs);
        self.run(Stage::Build, target.name())
    }

    fn properclean(&self, project: &Project) -> Result<()> {
        record(&self.calls, format!("properclean {}", project.name()));
        Ok(())
    }
}

/// Collects every stage event.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Log<StageEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StageEvent> {
        snapshot(&self.events)
    }
}

impl StageObserver for RecordingObserver {
    fn on_event(&self, event: &StageEvent) {
        record(&self.events, event.clone());
    }
}
