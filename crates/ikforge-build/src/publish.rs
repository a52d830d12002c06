//! Atomic artifact publication.
//!
//! Artifacts are written to a temporary sibling and renamed into place, so a
//! reader sees either the previous file, no file, or the complete new file.

use std::fs;
use std::path::{Path, PathBuf};

use ikforge_core::ForgeError;

/// Create every missing parent directory of `path`.
pub fn ensure_parent_dirs(path: &Path) -> Result<(), ForgeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ForgeError::io(parent, e))?;
    }
    Ok(())
}

/// Temporary sibling of `path`: `.<file name>.<pid>.tmp` in the same directory.
///
/// Same directory keeps the final rename on one filesystem.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

/// Write `contents` to `path` atomically.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), ForgeError> {
    ensure_parent_dirs(path)?;
    let tmp = temp_path_for(path);
    fs::write(&tmp, contents).map_err(|e| ForgeError::io(&tmp, e))?;
    publish(&tmp, path)
}

/// Rename a finished temporary file onto `path`. The temporary file is
/// removed if the rename fails.
pub fn publish(tmp: &Path, path: &Path) -> Result<(), ForgeError> {
    fs::rename(tmp, path).map_err(|e| {
        let _ = fs::remove_file(tmp);
        ForgeError::io(path, e)
    })
}
