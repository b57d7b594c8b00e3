//! Local directory package manager.
//!
//! Catalogs are plain directories laid out as
//! `<source>/<type>s/<name>/<version>/` (the core lives under
//! `<source>/unikraft/<version>/`). Registered sources are kept in
//! `sources.toml`; `update` writes a JSON index of every source so later
//! queries can skip the directory scan.

use std::cmp::Ordering;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::component::ComponentType;
use crate::core::format::PackageFormat;
use crate::core::target::Target;
use crate::packmanager::manager::{PackOptions, PackageManager};
use crate::packmanager::package::{Package, PullOptions, PullOutcome};
use crate::packmanager::query::CatalogQuery;
use crate::util::context::GlobalContext;
use crate::util::fs;
use crate::util::hash::{sha256_dir, sha256_file};

/// Format string of the local backend.
pub const LOCAL_FORMAT: &str = "local";

/// Marker written into every pulled package holding its checksum.
pub const CHECKSUM_MARKER: &str = ".ukbuild-checksum";

const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SourceList {
    #[serde(default)]
    sources: Vec<String>,
}

/// One package directory found in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub component_type: ComponentType,
    pub version: String,
    pub path: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogIndex {
    entries: Vec<CatalogEntry>,
}

/// Metadata stored next to the kernel in a packed archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub architecture: String,
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    pub initrd: bool,
    pub kconfig: bool,
}

/// Package manager backed by directories on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalManager {
    sources_path: PathBuf,
    index_path: PathBuf,
}

impl LocalManager {
    pub fn new(sources_path: impl Into<PathBuf>, index_path: impl Into<PathBuf>) -> Self {
        LocalManager {
            sources_path: sources_path.into(),
            index_path: index_path.into(),
        }
    }

    /// A manager using the source list and index in the ukbuild home.
    pub fn from_context(ctx: &GlobalContext) -> Self {
        Self::new(ctx.sources_path(), ctx.index_path())
    }

    /// Registered catalog directories.
    pub fn sources(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .read_source_list()?
            .sources
            .into_iter()
            .map(PathBuf::from)
            .collect())
    }

    fn read_source_list(&self) -> Result<SourceList> {
        if !self.sources_path.exists() {
            return Ok(SourceList::default());
        }
        let contents = fs::read_to_string(&self.sources_path)?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", self.sources_path.display()))
    }

    fn write_source_list(&self, list: &SourceList) -> Result<()> {
        let contents = toml::to_string_pretty(list).context("failed to serialize source list")?;
        fs::write_string(&self.sources_path, &contents)?;

        // The index describes the old source list.
        if self.index_path.exists() {
            std::fs::remove_file(&self.index_path).with_context(|| {
                format!("failed to remove stale index {}", self.index_path.display())
            })?;
        }
        Ok(())
    }

    fn load_index(&self) -> Option<CatalogIndex> {
        let contents = std::fs::read_to_string(&self.index_path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::warn!("ignoring corrupt index {}: {}", self.index_path.display(), e);
                None
            }
        }
    }

    fn scan_all(&self) -> Result<Vec<CatalogEntry>> {
        let mut entries = Vec::new();
        for source in self.sources()? {
            if !source.is_dir() {
                tracing::warn!("skipping missing source {}", source.display());
                continue;
            }
            entries.extend(scan_source(&source)?);
        }
        Ok(entries)
    }

    /// Entries visible to `query`, from the index when allowed.
    fn entries(&self, query: &CatalogQuery) -> Result<Vec<CatalogEntry>> {
        if !query.source().is_empty() {
            let root = existing_dir(query.source()).ok_or_else(|| {
                anyhow::anyhow!("source `{}` is not a local catalog directory", query.source())
            })?;
            return scan_source(&root);
        }

        if !query.no_cache() {
            if let Some(index) = self.load_index() {
                tracing::debug!("answering `{}` from {}", query, self.index_path.display());
                return Ok(index
                    .entries
                    .into_iter()
                    .filter(|e| e.path.is_dir())
                    .collect());
            }
        }

        self.scan_all()
    }
}

impl PackageManager for LocalManager {
    fn format(&self) -> PackageFormat {
        PackageFormat::from(LOCAL_FORMAT)
    }

    fn catalog(&self, query: &CatalogQuery) -> Result<Vec<Box<dyn Package>>> {
        let mut packages: Vec<Box<dyn Package>> = Vec::new();
        for entry in self.entries(query)? {
            if query.matches(&entry.name, entry.component_type, &entry.version) {
                packages.push(Box::new(LocalPackage::from_entry(entry)?));
            }
        }
        Ok(packages)
    }

    fn pack(&self, target: &Target, options: &PackOptions) -> Result<Box<dyn Package>> {
        options.cancel.check()?;

        let kernel = if target.kernel_dbg() {
            target.kernel_dbg_path()
        } else {
            target.kernel().to_path_buf()
        };
        if !kernel.is_file() {
            bail!(
                "kernel image {} does not exist, build `{}` first",
                kernel.display(),
                target.name()
            );
        }

        let output = match &options.output {
            Some(output) => output.clone(),
            None => default_output(target, &kernel),
        };
        if output.exists() && !options.force {
            bail!("{} already exists, use --force to overwrite it", output.display());
        }

        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::ensure_dir(&parent)?;

        let initrd = options.initrd.as_deref().or(target.initrd());
        let metadata = PackageMetadata {
            name: target.name().to_string(),
            architecture: target.architecture().to_string(),
            platform: target.platform().to_string(),
            kernel_version: options.kernel_version.clone(),
            command: target.command().to_vec(),
            initrd: initrd.is_some(),
            kconfig: options.kconfig,
        };

        let mut staged = tempfile::Builder::new()
            .prefix(".pack-")
            .suffix(".tmp")
            .tempfile_in(&parent)
            .with_context(|| format!("failed to create temporary file in {}", parent.display()))?;

        {
            let encoder = GzEncoder::new(staged.as_file_mut(), Compression::default());
            let mut archive = tar::Builder::new(encoder);

            archive
                .append_path_with_name(&kernel, "kernel")
                .with_context(|| format!("failed to add {}", kernel.display()))?;
            if let Some(initrd) = initrd {
                archive
                    .append_path_with_name(initrd, "initrd")
                    .with_context(|| format!("failed to add {}", initrd.display()))?;
            }
            if options.kconfig {
                append_bytes(&mut archive, ".config", target.kconfig().to_dotconfig().as_bytes())?;
            }
            let json = serde_json::to_vec_pretty(&metadata)?;
            append_bytes(&mut archive, METADATA_FILE, &json)?;

            archive
                .into_inner()
                .context("failed to finish archive")?
                .finish()
                .context("failed to compress archive")?;
        }

        options.cancel.check()?;
        staged
            .persist(&output)
            .map_err(|e| e.error)
            .with_context(|| format!("failed to write {}", output.display()))?;

        tracing::info!("packaged {} into {}", target.name(), output.display());

        Ok(Box::new(LocalArchive {
            name: metadata.name,
            version: metadata.kernel_version.unwrap_or_default(),
            checksum: sha256_file(&output)?,
            path: output,
        }))
    }

    fn add_source(&self, source: &str) -> Result<()> {
        let path = existing_dir(source)
            .ok_or_else(|| anyhow::anyhow!("`{}` is not a local catalog directory", source))?;
        let path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", path.display()))?;
        let entry = path.display().to_string();

        let mut list = self.read_source_list()?;
        if list.sources.contains(&entry) {
            tracing::debug!("source {} is already registered", entry);
            return Ok(());
        }
        list.sources.push(entry);
        self.write_source_list(&list)?;

        tracing::info!("added source {}", path.display());
        Ok(())
    }

    fn remove_source(&self, source: &str) -> Result<()> {
        let entry = existing_dir(source)
            .and_then(|p| p.canonicalize().ok())
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| source.to_string());

        let mut list = self.read_source_list()?;
        let before = list.sources.len();
        list.sources.retain(|s| s != &entry && s != source);
        if list.sources.len() == before {
            bail!("source `{}` is not registered", source);
        }
        self.write_source_list(&list)?;

        tracing::info!("removed source {}", entry);
        Ok(())
    }

    fn update(&self) -> Result<()> {
        let index = CatalogIndex {
            entries: self.scan_all()?,
        };
        let json = serde_json::to_string_pretty(&index).context("failed to serialize index")?;
        fs::write_string(&self.index_path, &json)?;

        tracing::info!(
            "indexed {} package(s) into {}",
            index.entries.len(),
            self.index_path.display()
        );
        Ok(())
    }

    fn is_compatible(&self, locator: &str) -> Result<bool> {
        if existing_dir(locator).is_some() {
            return Ok(true);
        }
        let query = CatalogQuery::new(locator);
        Ok(self.entries(&query)?.iter().any(|e| e.name == locator))
    }
}

/// A package directory in a local catalog.
#[derive(Debug, Clone)]
pub struct LocalPackage {
    entry: CatalogEntry,
    checksum: String,
}

impl LocalPackage {
    pub fn from_entry(entry: CatalogEntry) -> Result<Self> {
        let checksum = sha256_dir(&entry.path, &[CHECKSUM_MARKER])?;
        Ok(LocalPackage { entry, checksum })
    }

    /// Directory the package is copied from.
    pub fn path(&self) -> &Path {
        &self.entry.path
    }
}

impl Package for LocalPackage {
    fn name(&self) -> &str {
        &self.entry.name
    }

    fn component_type(&self) -> ComponentType {
        self.entry.component_type
    }

    fn version(&self) -> &str {
        &self.entry.version
    }

    fn format(&self) -> PackageFormat {
        PackageFormat::from(LOCAL_FORMAT)
    }

    fn checksum(&self) -> Option<&str> {
        Some(&self.checksum)
    }

    fn pull(&self, options: &PullOptions) -> Result<PullOutcome> {
        options.cancel.check()?;

        let dest = self.placement(&options.workdir);
        if options.cache && is_materialized(&dest, &self.checksum) {
            tracing::debug!("{} is up to date", self.type_name_version());
            return Ok(PullOutcome::UpToDate(dest));
        }

        let staged = fs::staging_dir_for(&dest)?;
        fs::copy_dir_all(&self.entry.path, staged.path())?;

        if options.checksum {
            let actual = sha256_dir(staged.path(), &[CHECKSUM_MARKER])?;
            if actual != self.checksum {
                bail!(
                    "checksum mismatch for {}: expected {}, found {}",
                    self.type_name_version(),
                    self.checksum,
                    actual
                );
            }
        }
        fs::write_string(&staged.path().join(CHECKSUM_MARKER), &self.checksum)?;

        options.cancel.check()?;
        fs::replace_dir(staged, &dest)?;

        tracing::info!("pulled {} into {}", self.type_name_version(), dest.display());
        Ok(PullOutcome::Pulled(dest))
    }
}

/// A packed target archive.
#[derive(Debug, Clone)]
pub struct LocalArchive {
    name: String,
    version: String,
    path: PathBuf,
    checksum: String,
}

impl LocalArchive {
    /// The archive on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Package for LocalArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn component_type(&self) -> ComponentType {
        ComponentType::App
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn format(&self) -> PackageFormat {
        PackageFormat::from(LOCAL_FORMAT)
    }

    fn checksum(&self) -> Option<&str> {
        Some(&self.checksum)
    }

    fn pull(&self, options: &PullOptions) -> Result<PullOutcome> {
        options.cancel.check()?;

        let dest = self.placement(&options.workdir);
        if options.cache && is_materialized(&dest, &self.checksum) {
            return Ok(PullOutcome::UpToDate(dest));
        }

        if options.checksum {
            let actual = sha256_file(&self.path)?;
            if actual != self.checksum {
                bail!("checksum mismatch for {}", self.path.display());
            }
        }

        let staged = fs::staging_dir_for(&dest)?;
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        tar::Archive::new(GzDecoder::new(file))
            .unpack(staged.path())
            .with_context(|| format!("failed to unpack {}", self.path.display()))?;
        fs::write_string(&staged.path().join(CHECKSUM_MARKER), &self.checksum)?;

        options.cancel.check()?;
        fs::replace_dir(staged, &dest)?;
        Ok(PullOutcome::Pulled(dest))
    }
}

/// Resolve a locator naming an existing directory, either a plain path or a
/// `file://` URL.
pub fn existing_dir(locator: &str) -> Option<PathBuf> {
    let path = if locator.starts_with("file://") {
        Url::parse(locator).ok()?.to_file_path().ok()?
    } else {
        PathBuf::from(locator)
    };
    path.is_dir().then_some(path)
}

/// Walk one catalog directory.
pub fn scan_source(root: &Path) -> Result<Vec<CatalogEntry>> {
    let mut entries = Vec::new();

    for component_type in ComponentType::all() {
        let type_dir = root.join(component_type.plural());
        if component_type == ComponentType::Core {
            for (version, path) in versions(&type_dir)? {
                entries.push(CatalogEntry {
                    name: component_type.plural().to_string(),
                    component_type,
                    version,
                    path,
                });
            }
            continue;
        }

        for (name, name_dir) in subdirs(&type_dir)? {
            for (version, path) in versions(&name_dir)? {
                entries.push(CatalogEntry {
                    name: name.clone(),
                    component_type,
                    version,
                    path,
                });
            }
        }
    }

    Ok(entries)
}

/// Version directories, semantic versions first in ascending order, then
/// named channels such as `stable` alphabetically.
fn versions(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut versions = subdirs(dir)?;
    versions.sort_by(|(a, _), (b, _)| compare_versions(a, b));
    Ok(versions)
}

pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| semver::Version::parse(v.trim_start_matches('v')).ok();
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() && !name.starts_with('.') {
            dirs.push((name, entry.path()));
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn is_materialized(dest: &Path, checksum: &str) -> bool {
    std::fs::read_to_string(dest.join(CHECKSUM_MARKER))
        .map(|marker| marker.trim() == checksum)
        .unwrap_or(false)
}

fn default_output(target: &Target, kernel: &Path) -> PathBuf {
    let dir = kernel.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{}.tar.gz", target.name()))
}

fn append_bytes<W: Write>(archive: &mut tar::Builder<W>, name: &str, data: &[u8]) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    archive
        .append_data(&mut header, name, data)
        .with_context(|| format!("failed to add {}", name))
}
