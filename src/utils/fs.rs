//! File system utilities for keel.
//!
//! Provisioning projects are rebuilt in place on every plan, so the helpers
//! here favour idempotence: [`ensure_dir`] tolerates existing directories and
//! [`atomic_write`] replaces file contents through a write-then-rename so a
//! reader never observes a partially rendered `main.tf`.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Ensures a directory exists, creating it and any missing parents.
///
/// # Errors
///
/// Fails when the path exists but is not a directory, or creation fails.
///
/// # Examples
///
/// ```rust
/// use keel::utils::fs::ensure_dir;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// ensure_dir(Path::new("state/my-project/plans"))?;
/// # Ok(())
/// # }
/// ```
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| {
            format!(
                "Failed to create directory: {}\n\nCheck directory permissions and path validity",
                path.display()
            )
        })?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Safely writes a string to a file using atomic operations.
///
/// Convenience wrapper around [`atomic_write`] for rendered text.
pub fn safe_write(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// The content goes to a `.tmp` sibling first, is synced to disk, then
/// renamed over the target. Readers see either the old content or the new,
/// never a partial write. Parent directories are created as needed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let temp_path = path.with_extension("tmp");

    {
        let mut file = fs::File::create(&temp_path).with_context(|| {
            format!(
                "Failed to create temp file: {}\n\nCheck file permissions and that directory exists",
                temp_path.display()
            )
        })?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all().with_context(|| "Failed to sync file to disk")?;
    }

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Finds the first file named `file_name` anywhere under `dir`, depth-first.
///
/// Returns `None` when the directory does not exist or holds no such file.
/// Used for the structural module checks (`variables.tf`, `outputs.tf`) and
/// chart values discovery (`values.yaml`), which all accept the file at any
/// depth inside the cloned tree.
#[must_use]
pub fn find_file_recursive(dir: &Path, file_name: &str) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }
    WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
        .map(|entry| entry.into_path())
}
