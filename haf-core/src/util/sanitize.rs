use std::path::{Path, PathBuf};

use crate::error::{HafError, Result};

pub const ARCHIVE_EXT: &str = "haf";

/// A flat entry name: one path component, no separators, not `.` or `..`.
pub fn is_safe_entry_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// `archive_name` plus the `.haf` suffix when it is missing.
pub fn archive_file_name(archive_name: &str) -> Result<String> {
    if !is_safe_entry_name(archive_name) {
        return Err(HafError::InvalidInput(format!(
            "invalid archive name: {archive_name:?}"
        )));
    }
    let suffix = format!(".{ARCHIVE_EXT}");
    if archive_name.ends_with(&suffix) && archive_name.len() > suffix.len() {
        Ok(archive_name.to_string())
    } else {
        Ok(format!("{archive_name}{suffix}"))
    }
}

/// Last path component of a source file, as stored in the manifest.
///
/// Manifest names are UTF-8 strings, so a file whose name is not valid UTF-8
/// is rejected with [`HafError::InvalidInput`] instead of being renamed lossily.
pub fn entry_name(src: &Path) -> Result<String> {
    let name = src.file_name().ok_or_else(|| {
        HafError::InvalidInput(format!("source has no file name: {}", src.display()))
    })?;
    let name = name.to_str().ok_or_else(|| {
        HafError::InvalidInput(format!("file name is not valid UTF-8: {}", src.display()))
    })?;
    if !is_safe_entry_name(name) {
        return Err(HafError::InvalidInput(format!("unsafe file name: {name:?}")));
    }
    Ok(name.to_string())
}

pub fn safe_join(root: &Path, name: &str) -> Result<PathBuf> {
    if !is_safe_entry_name(name) {
        return Err(HafError::CorruptManifest(format!("unsafe path: {name:?}")));
    }
    Ok(root.join(name))
}
