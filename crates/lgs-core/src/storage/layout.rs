//! Resource registry: job directories and shared bins.
//!
//! Layout under the base directory:
//!
//! ```text
//! settings.json
//! servers/servers.json
//! servers/<game_type>/<id>/          one per job
//! storage/<game_type>/<bin>/<file>   shared, read-only from a job's view
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use super::fs::{self as lfs, DirEntryInfo};
use crate::domain::JobKey;
use crate::error::CoreError;

pub const SERVERS_DIR_NAME: &str = "servers";
pub const STORAGE_DIR_NAME: &str = "storage";
const SETTINGS_FILE_NAME: &str = "settings.json";
const SERVERS_FILE_NAME: &str = "servers.json";

/// Paths and filesystem operations for one managed base directory.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    base_dir: PathBuf,
    servers_dir: PathBuf,
    storage_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            servers_dir: base_dir.join(SERVERS_DIR_NAME),
            storage_dir: base_dir.join(STORAGE_DIR_NAME),
            base_dir,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn servers_dir(&self) -> &Path {
        &self.servers_dir
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.base_dir.join(SETTINGS_FILE_NAME)
    }

    pub fn servers_document_path(&self) -> PathBuf {
        self.servers_dir.join(SERVERS_FILE_NAME)
    }

    /// `servers/<game_type>/<id>/`
    pub fn server_dir(&self, job: &JobKey) -> PathBuf {
        self.servers_dir.join(&job.game_type).join(&job.id)
    }

    /// `storage/<game_type>/<bin>/`
    pub fn bin_dir(&self, game_type: &str, bin: &str) -> PathBuf {
        self.storage_dir.join(game_type).join(bin)
    }

    /// Create a job's working directory.
    ///
    /// A pre-existing directory is an `AlreadyExists` error, never reused silently.
    pub fn allocate_directory(&self, job: &JobKey) -> Result<PathBuf, CoreError> {
        check_relative(&job.game_type)?;
        check_segment(&job.id)?;

        let dir = self.server_dir(job);
        if lfs::exists(&dir) {
            return Err(CoreError::AlreadyExists(format!(
                "server directory {} already exists",
                dir.display()
            )));
        }
        fs::create_dir_all(&dir).map_err(|e| CoreError::io(&dir, e))?;
        debug!(job = %job, dir = %dir.display(), "Allocated server directory");
        Ok(dir)
    }

    /// Create a shared bin if it does not exist yet.
    pub fn ensure_bin(&self, game_type: &str, bin: &str) -> Result<PathBuf, CoreError> {
        check_relative(game_type)?;
        check_segment(bin)?;
        let dir = self.bin_dir(game_type, bin);
        fs::create_dir_all(&dir).map_err(|e| CoreError::io(&dir, e))?;
        Ok(dir)
    }

    /// Link `storage/<source_game_type>/<bin>/<file>` into a job's directory.
    ///
    /// The destination name defaults to the source's base name. Returns the
    /// path of the created link.
    pub fn link_shared_asset(
        &self,
        source_game_type: &str,
        bin: &str,
        file: &str,
        job: &JobKey,
        dest_name: Option<&str>,
    ) -> Result<PathBuf, CoreError> {
        check_relative(source_game_type)?;
        check_segment(bin)?;
        check_relative(file)?;

        let source = self.bin_dir(source_game_type, bin).join(file);
        if !lfs::exists(&source) {
            return Err(CoreError::NotFound(format!(
                "shared file {} does not exist",
                source.display()
            )));
        }
        let source = fs::canonicalize(&source).map_err(|e| CoreError::io(&source, e))?;
        if !self.is_under_storage(&source) {
            return Err(CoreError::Integrity(format!(
                "shared file {} resolves outside shared storage",
                source.display()
            )));
        }

        let dest_name = match dest_name {
            Some(name) => name.to_string(),
            None => source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| CoreError::Integrity(format!("{file} has no file name")))?,
        };
        check_segment(&dest_name)?;

        let server_dir = self.server_dir(job);
        if !server_dir.is_dir() {
            return Err(CoreError::NotFound(format!(
                "server directory {} does not exist",
                server_dir.display()
            )));
        }
        let dest = server_dir.join(&dest_name);
        if lfs::exists(&dest) {
            return Err(CoreError::AlreadyExists(format!(
                "{} already exists",
                dest.display()
            )));
        }

        lfs::create_symlink(&source, &dest)?;
        debug!(job = %job, source = %source.display(), dest = %dest.display(), "Linked shared asset");
        Ok(dest)
    }

    /// Remove a shared-asset link from a job's directory, never its target.
    pub fn unlink_shared_asset(&self, job: &JobKey, file_name: &str) -> Result<(), CoreError> {
        check_relative(file_name)?;
        let link = self.server_dir(job).join(file_name);

        if !lfs::exists(&link) {
            return Err(CoreError::NotFound(format!(
                "{} does not exist",
                link.display()
            )));
        }
        if !lfs::is_symlink(&link) {
            return Err(CoreError::Integrity(format!(
                "{} is not a symlink",
                link.display()
            )));
        }
        let target = lfs::link_target(&link)?;
        if !self.is_under_storage(&target) {
            return Err(CoreError::Integrity(format!(
                "{} points to {}, outside shared storage",
                link.display(),
                target.display()
            )));
        }

        lfs::remove_link(&link)?;
        debug!(job = %job, link = %link.display(), "Removed shared asset link");
        Ok(())
    }

    /// List a directory inside a job's working directory.
    pub fn list_server_directory(
        &self,
        job: &JobKey,
        relative: Option<&str>,
    ) -> Result<Vec<DirEntryInfo>, CoreError> {
        let mut dir = self.server_dir(job);
        if let Some(rel) = relative.filter(|r| !r.is_empty()) {
            check_relative(rel)?;
            dir.push(rel);
        }
        lfs::list_directory(&dir)
    }

    /// Read a text file inside a job's working directory.
    pub fn read_server_file(&self, job: &JobKey, relative: &str) -> Result<String, CoreError> {
        check_relative(relative)?;
        let path = self.server_dir(job).join(relative);
        lfs::read_optional(&path)?
            .ok_or_else(|| CoreError::NotFound(format!("{} does not exist", path.display())))
    }

    fn is_under_storage(&self, path: &Path) -> bool {
        let path = lfs::normalize(path);
        let mut roots = Vec::with_capacity(2);
        if let Ok(root) = lfs::absolute(&self.storage_dir) {
            roots.push(root);
        }
        if let Ok(root) = fs::canonicalize(&self.storage_dir) {
            roots.push(root);
        }
        roots
            .iter()
            .any(|root| path.starts_with(root) && path != *root)
    }
}

/// A single path segment: no separators, no `.`/`..`, not empty.
fn check_segment(name: &str) -> Result<(), CoreError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(CoreError::Integrity(format!(
            "{name:?} is not a valid file name"
        ))),
    }
}

/// A relative path made only of normal segments.
fn check_relative(path: &str) -> Result<(), CoreError> {
    let valid = !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if valid {
        Ok(())
    } else {
        Err(CoreError::Integrity(format!(
            "{path:?} is not a valid relative path"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout() -> (TempDir, StorageLayout) {
        let dir = TempDir::new().unwrap();
        let layout = StorageLayout::new(dir.path());
        (dir, layout)
    }

    #[test]
    fn allocate_directory_rejects_existing() {
        let (_dir, layout) = layout();
        let job = JobKey::new("minecraft", "survival");

        let path = layout.allocate_directory(&job).unwrap();
        assert!(path.ends_with("servers/minecraft/survival"));
        assert!(path.is_dir());

        let err = layout.allocate_directory(&job).unwrap_err();
        assert!(err.is_already_exists());
    }

    #[test]
    fn sub_types_nest_directories() {
        let (_dir, layout) = layout();
        let job = JobKey::new("minecraft/paper", "lobby");
        let path = layout.allocate_directory(&job).unwrap();
        assert!(path.ends_with("servers/minecraft/paper/lobby"));
    }

    #[test]
    fn traversal_in_names_is_rejected() {
        let (_dir, layout) = layout();
        let err = layout
            .allocate_directory(&JobKey::new("minecraft", "../escape"))
            .unwrap_err();
        assert!(matches!(err, CoreError::Integrity(_)));

        let job = JobKey::new("minecraft", "ok");
        layout.allocate_directory(&job).unwrap();
        let err = layout
            .link_shared_asset("minecraft", "jars", "../../settings.json", &job, None)
            .unwrap_err();
        assert!(matches!(err, CoreError::Integrity(_)));
    }

    #[cfg(unix)]
    #[test]
    fn link_and_unlink_shared_asset() {
        let (_dir, layout) = layout();
        let job = JobKey::new("mc", "one");
        layout.allocate_directory(&job).unwrap();
        let bin = layout.ensure_bin("mc", "jars").unwrap();
        fs::write(bin.join("server.jar"), b"jar").unwrap();

        let link = layout
            .link_shared_asset("mc", "jars", "server.jar", &job, None)
            .unwrap();
        assert!(lfs::is_symlink(&link));
        assert_eq!(
            fs::canonicalize(&link).unwrap(),
            fs::canonicalize(bin.join("server.jar")).unwrap()
        );

        let err = layout
            .link_shared_asset("mc", "jars", "server.jar", &job, None)
            .unwrap_err();
        assert!(err.is_already_exists());

        layout.unlink_shared_asset(&job, "server.jar").unwrap();
        assert!(!lfs::exists(&link));
        assert!(bin.join("server.jar").exists());
    }

    #[test]
    fn missing_source_is_not_found() {
        let (_dir, layout) = layout();
        let job = JobKey::new("mc", "one");
        layout.allocate_directory(&job).unwrap();
        let err = layout
            .link_shared_asset("mc", "jars", "nope.jar", &job, None)
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn read_server_file_stays_inside_job() {
        let (_dir, layout) = layout();
        let job = JobKey::new("mc", "one");
        let dir = layout.allocate_directory(&job).unwrap();
        fs::write(dir.join("server.properties"), "motd=hi").unwrap();

        assert_eq!(
            layout.read_server_file(&job, "server.properties").unwrap(),
            "motd=hi"
        );
        assert!(layout.read_server_file(&job, "../../settings.json").is_err());
    }
}
