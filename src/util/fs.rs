//! Filesystem utilities.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Recursively copy a directory.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Create a staging directory next to `dest` so it can later be renamed
/// over it without crossing filesystems.
pub fn staging_dir_for(dest: &Path) -> Result<TempDir> {
    let parent = dest
        .parent()
        .ok_or_else(|| anyhow::anyhow!("{} has no parent directory", dest.display()))?;
    ensure_dir(parent)?;

    tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(parent)
        .with_context(|| format!("failed to create staging directory in {}", parent.display()))
}

/// Move a fully written staging directory into `dest`, replacing whatever
/// was there.
///
/// The previous tree is moved aside first and only deleted once the staged
/// tree is in place; on failure it is restored and the staging directory is
/// removed.
pub fn replace_dir(staged: TempDir, dest: &Path) -> Result<()> {
    let previous = if dest.exists() {
        let aside = staging_dir_for(dest)?;
        fs::rename(dest, aside.path().join("previous"))
            .with_context(|| format!("failed to move {} aside", dest.display()))?;
        Some(aside)
    } else {
        None
    };

    if let Err(e) = fs::rename(staged.path(), dest) {
        if let Some(aside) = &previous {
            if let Err(restore) = fs::rename(aside.path().join("previous"), dest) {
                tracing::warn!("failed to restore {}: {}", dest.display(), restore);
            }
        }
        return Err(e).with_context(|| {
            format!(
                "failed to move {} into place at {}",
                staged.path().display(),
                dest.display()
            )
        });
    }

    // The staged path no longer exists; only release ownership of it.
    let _ = staged.into_path();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_all() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("file.txt"), "content").unwrap();
        fs::write(src.join("nested/inner.txt"), "inner").unwrap();

        copy_dir_all(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("file.txt")).unwrap(), "content");
        assert_eq!(fs::read_to_string(dst.join("nested/inner.txt")).unwrap(), "inner");
    }

    #[test]
    fn test_replace_dir() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("libs/musl");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("old.txt"), "old").unwrap();

        let staged = staging_dir_for(&dest).unwrap();
        fs::write(staged.path().join("new.txt"), "new").unwrap();
        replace_dir(staged, &dest).unwrap();

        assert!(!dest.join("old.txt").exists());
        assert!(dest.join("new.txt").exists());

        let leftovers: Vec<_> = fs::read_dir(tmp.path().join("libs")).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_replace_dir_failure_cleans_staging() {
        let tmp = TempDir::new().unwrap();
        let staged = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(tmp.path())
            .unwrap();
        let staged_path = staged.path().to_path_buf();
        fs::write(staged_path.join("new.txt"), "new").unwrap();

        let dest = tmp.path().join("missing/libs/musl");
        assert!(replace_dir(staged, &dest).is_err());

        assert!(!staged_path.exists());
        assert!(!dest.exists());
    }
}
