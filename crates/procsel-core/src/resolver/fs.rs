//! Locating process files below a material root.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

/// Extension of process files (compared case-insensitively).
pub const PROCESS_EXTENSION: &str = ".prc";

/// Lexically normalize a path: drop `.` and resolve `..` against the
/// preceding component.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}

/// Absolute, normalized form of a material root.
pub fn absolute_root(root: &Path) -> PathBuf {
    let absolute = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
    normalize_path(&absolute)
}

/// Directory a target points at. Sub-directories are authored with `\`
/// separators; both `\` and `/` are accepted.
pub fn target_dir(root: &Path, subdir: &str) -> PathBuf {
    let mut dir = root.to_path_buf();
    for part in subdir.split(['\\', '/']).filter(|p| !p.is_empty()) {
        dir.push(part);
    }
    normalize_path(&dir)
}

/// Profile name derived from a material root: its lower-cased folder name.
pub fn profile_name(root: &Path) -> Option<String> {
    normalize_path(root)
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
}

/// First regular file in `dir` (by name) called `{prefix}_*.prc`.
pub fn find_prefixed_file(dir: &Path, prefix: &str) -> io::Result<Option<PathBuf>> {
    let wanted = format!("{}_", prefix);

    let mut names: Vec<OsString> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.file_name()))
        .collect();
    names.sort();

    for name in names {
        let text = name.to_string_lossy();
        if !text.starts_with(&wanted) || !text.to_lowercase().ends_with(PROCESS_EXTENSION) {
            continue;
        }

        let path = dir.join(&name);
        if path.is_file() {
            debug!("File matches prefix '{}': {}", wanted, path.display());
            return Ok(Some(path));
        }
    }

    Ok(None)
}
