//! Hashing utilities for package checksums.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// Compute SHA256 hash of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute SHA256 hash of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    feed(&mut reader, &mut hasher)?;

    Ok(hex::encode(hasher.finalize()))
}

/// Compute a SHA256 checksum over a directory tree.
///
/// Files are visited in sorted order and both their relative path and
/// contents are hashed, so renames change the checksum. Top-level entries
/// named in `exclude` are skipped.
pub fn sha256_dir(root: &Path, exclude: &[&str]) -> Result<String> {
    let mut hasher = Sha256::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() != 1 || !exclude.iter().any(|x| e.file_name() == *x)
        });

    for entry in walker {
        let entry =
            entry.with_context(|| format!("failed to walk directory: {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        hasher.update(relative.to_string_lossy().replace('\\', "/").as_bytes());
        hasher.update(b"\0");

        let file = File::open(entry.path()).with_context(|| {
            format!("failed to open file for hashing: {}", entry.path().display())
        })?;
        feed(&mut BufReader::new(file), &mut hasher)?;
        hasher.update(b"\0");
    }

    Ok(hex::encode(hasher.finalize()))
}

fn feed(reader: &mut impl Read, hasher: &mut Sha256) -> Result<()> {
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_bytes() {
        assert_eq!(
            sha256_bytes(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_sha256_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.txt");
        std::fs::write(&path, "hello").unwrap();

        assert_eq!(sha256_file(&path).unwrap(), sha256_bytes(b"hello"));
    }

    #[test]
    fn test_sha256_dir_stable_and_excludes() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        for dir in [a.path(), b.path()] {
            std::fs::create_dir_all(dir.join("src")).unwrap();
            std::fs::write(dir.join("src/main.c"), "int main() {}").unwrap();
            std::fs::write(dir.join("Makefile.uk"), "LIB += x").unwrap();
        }
        std::fs::write(b.path().join(".marker"), "ignored").unwrap();

        assert_eq!(
            sha256_dir(a.path(), &[".marker"]).unwrap(),
            sha256_dir(b.path(), &[".marker"]).unwrap()
        );

        std::fs::write(b.path().join("src/main.c"), "int main() { return 1; }").unwrap();
        assert_ne!(
            sha256_dir(a.path(), &[".marker"]).unwrap(),
            sha256_dir(b.path(), &[".marker"]).unwrap()
        );
    }
}
