//! Fixtures shared by operation tests.

use std::path::Path;

use tempfile::TempDir;

use crate::core::manifest::MANIFEST_NAME;
use crate::util::context::GlobalContext;

/// Write `contents` as the project manifest in `dir`.
pub fn write_manifest(dir: &Path, contents: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(MANIFEST_NAME), contents).unwrap();
}

/// A context rooted in `tmp`, with its home directory inside it.
pub fn context(tmp: &TempDir) -> GlobalContext {
    GlobalContext::with_cwd(tmp.path().to_path_buf())
        .unwrap()
        .with_home(tmp.path().join("home"))
}
