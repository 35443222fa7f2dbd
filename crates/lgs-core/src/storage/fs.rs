//! Thin wrapper over `std::fs` with domain errors.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::CoreError;

/// Kind of a directory entry, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntryInfo {
    pub name: String,
    pub kind: EntryKind,
}

/// True if anything (including a dangling symlink) exists at `path`.
pub fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

/// Read a file, treating absence as `None`.
pub fn read_optional(path: &Path) -> Result<Option<String>, CoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CoreError::io(path, e)),
    }
}

/// Write a file atomically using temp file + rename, creating parents.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
    }

    let mut temp_name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, contents).map_err(|e| CoreError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| CoreError::io(path, e))
}

/// Create a symlink at `link` pointing to `target`.
pub fn create_symlink(target: &Path, link: &Path) -> Result<(), CoreError> {
    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(target, link);

    #[cfg(windows)]
    let result = if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    };

    result.map_err(|e| CoreError::io(link, e))
}

/// Resolve where a symlink points, made absolute against the link's parent.
pub fn link_target(link: &Path) -> Result<PathBuf, CoreError> {
    let target = fs::read_link(link).map_err(|e| CoreError::io(link, e))?;
    let absolute = if target.is_absolute() {
        target
    } else {
        link.parent().unwrap_or_else(|| Path::new("")).join(target)
    };
    Ok(normalize(&absolute))
}

pub fn remove_link(link: &Path) -> Result<(), CoreError> {
    fs::remove_file(link).map_err(|e| CoreError::io(link, e))
}

/// Lexically resolve `.` and `..` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Absolute form of `path`, relative paths joined onto the current directory.
pub fn absolute(path: &Path) -> Result<PathBuf, CoreError> {
    std::path::absolute(path)
        .map(|p| normalize(&p))
        .map_err(|e| CoreError::io(path, e))
}

/// List a directory, sorted by name.
pub fn list_directory(path: &Path) -> Result<Vec<DirEntryInfo>, CoreError> {
    let entries = fs::read_dir(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CoreError::NotFound(path.display().to_string()),
        _ => CoreError::io(path, e),
    })?;

    let mut listing = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::io(path, e))?;
        let file_type = entry.file_type().map_err(|e| CoreError::io(entry.path(), e))?;
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        listing.push(DirEntryInfo {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
        });
    }
    listing.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn normalize_collapses_parent_components() {
        assert_eq!(
            normalize(Path::new("/srv/storage/mc/../mc/./jars")),
            PathBuf::from("/srv/storage/mc/jars")
        );
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn write_atomic_creates_parents_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/settings.json");
        write_atomic(&path, b"{}").unwrap();

        assert_eq!(read_optional(&path).unwrap().as_deref(), Some("{}"));
        assert!(!dir.path().join("nested/settings.json.tmp").exists());
    }

    #[test]
    fn read_optional_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_optional(&dir.path().join("missing")).unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn listing_reports_symlinks() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        create_symlink(&dir.path().join("b.txt"), &dir.path().join("c")).unwrap();

        let listing = list_directory(dir.path()).unwrap();
        let kinds: Vec<_> = listing.iter().map(|e| (e.name.as_str(), e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("a", EntryKind::Directory),
                ("b.txt", EntryKind::File),
                ("c", EntryKind::Symlink)
            ]
        );
        assert!(is_symlink(&dir.path().join("c")));
        assert_eq!(link_target(&dir.path().join("c")).unwrap(), dir.path().join("b.txt"));
    }
}
