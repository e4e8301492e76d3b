use crate::errors::CoreError;
use crate::fs::FileSystem;
use crate::helpers::{base_name, build_trashed_name, restored_file_name, unix_timestamp};
use crate::manifest::ManifestSnapshot;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// An item now held by the trash.
#[derive(Debug)]
pub struct MovedIn {
    pub trashed_name: String,
    pub timestamp: i64,
    /// Set when a cross-device copy completed but the source could not be
    /// fully removed afterwards.
    pub leftover: Option<CoreError>,
}

/// An artifact now back outside the trash.
#[derive(Debug)]
pub struct MovedOut {
    pub destination: PathBuf,
    /// Set when a cross-device copy completed but the artifact could not be
    /// fully removed from the trash afterwards.
    pub leftover: Option<CoreError>,
}

/// Owns the physical trash root and every artifact inside it.
pub struct TrashStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl TrashStore {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the trash root if this is the first item trashed.
    pub fn ensure_root(&self) -> crate::Result<()> {
        if !self.fs.exists(&self.root) {
            debug!(root = %self.root.display(), "creating trash root");
        }
        self.fs.create_dir_all(&self.root)
    }

    pub fn artifact_path(&self, trashed_name: &str) -> PathBuf {
        self.root.join(trashed_name)
    }

    pub fn contains(&self, trashed_name: &str) -> bool {
        self.fs.exists(&self.artifact_path(trashed_name))
    }

    /// Refuses the trash root itself, anything inside it and its ancestors.
    pub fn check_target(&self, path: &Path) -> crate::Result<()> {
        if path.starts_with(&self.root) {
            return Err(CoreError::invalid_target(path, "it is the trash or lives inside it"));
        }
        if self.root.starts_with(path) {
            return Err(CoreError::invalid_target(path, "it contains the trash"));
        }
        Ok(())
    }

    /// Moves `source` under the trash root. The chosen name is free both on
    /// disk and among the records in `recorded`.
    pub fn move_in(&self, source: &Path, recorded: &ManifestSnapshot) -> crate::Result<MovedIn> {
        self.check_target(source)?;
        let base = base_name(source)
            .ok_or_else(|| CoreError::invalid_target(source, "it has no usable file name"))?;

        self.ensure_root()?;
        let timestamp = unix_timestamp(self.fs.now());
        let mut disambiguator = 0;
        let trashed_name = loop {
            let candidate = build_trashed_name(timestamp, disambiguator, base);
            if !self.contains(&candidate) && !recorded.records(&candidate) {
                break candidate;
            }
            disambiguator += 1;
        };

        let target = self.artifact_path(&trashed_name);
        let leftover = self
            .relocate(source, &target)
            .map_err(|err| CoreError::TrashMove {
                path: source.to_path_buf(),
                source: Box::new(err),
            })?;
        debug!(source = %source.display(), %trashed_name, "moved into trash");
        Ok(MovedIn {
            trashed_name,
            timestamp,
            leftover,
        })
    }

    /// Moves an artifact back out to `destination`, or to a `_restored`
    /// sibling of it when something already occupies that path.
    pub fn move_out(&self, trashed_name: &str, destination: &Path) -> crate::Result<MovedOut> {
        let artifact = self.artifact_path(trashed_name);
        let metadata = self
            .fs
            .symlink_metadata(&artifact)
            .map_err(|_| CoreError::MissingArtifact(trashed_name.to_string()))?;

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs
                .create_dir_all(parent)
                .map_err(|err| CoreError::ParentMissing(parent.to_path_buf(), Box::new(err)))?;
        }

        let target = self.free_destination(destination, metadata.is_dir())?;
        let leftover = self
            .relocate(&artifact, &target)
            .map_err(|err| CoreError::RestoreMove {
                trashed_name: trashed_name.to_string(),
                destination: target.clone(),
                source: Box::new(err),
            })?;
        debug!(%trashed_name, destination = %target.display(), "moved out of trash");
        Ok(MovedOut {
            destination: target,
            leftover,
        })
    }

    fn free_destination(&self, destination: &Path, is_dir: bool) -> crate::Result<PathBuf> {
        if !self.fs.exists(destination) {
            return Ok(destination.to_path_buf());
        }
        let name = base_name(destination)
            .ok_or_else(|| CoreError::invalid_target(destination, "it has no usable file name"))?;
        let mut attempt = 1;
        loop {
            let candidate = destination.with_file_name(restored_file_name(name, attempt, is_dir));
            if !self.fs.exists(&candidate) {
                return Ok(candidate);
            }
            attempt += 1;
        }
    }

    /// Rename, falling back to copy-then-delete across filesystems.
    ///
    /// Once a copy is complete the move counts as done: a failure to remove
    /// the source afterwards is handed back rather than returned as an error.
    fn relocate(&self, from: &Path, to: &Path) -> crate::Result<Option<CoreError>> {
        match self.fs.rename(from, to) {
            Ok(()) => Ok(None),
            Err(err) if err.is_cross_device() => {
                warn!(
                    from = %from.display(),
                    to = %to.display(),
                    "rename crosses devices, copying instead"
                );
                if let Err(err) = self.fs.copy_tree(from, to) {
                    if self.fs.exists(to) {
                        let _ = self.fs.remove_all(to);
                    }
                    return Err(err);
                }
                Ok(self.fs.remove_all(from).err())
            }
            Err(err) => Err(err),
        }
    }
}
