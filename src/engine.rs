//! Safe delete and restore as single logical operations.
//!
//! An item is LIVE at its original location, TRASHED once it sits under the
//! trash root with a manifest record, and RESTORED when moved back and its
//! record dropped. A move whose record could not be written leaves an
//! ORPHANED artifact that only direct inspection of the trash root finds.

use crate::config::ExplorerConfig;
use crate::errors::CoreError;
use crate::fs::{FileSystem, RealFileSystem};
use crate::helpers::sanitize_user_path;
use crate::manifest::{ManifestSnapshot, TrashManifest};
use crate::models::{ItemKind, ManifestEntry};
use crate::store::TrashStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct TrashOutcome {
    pub trashed_name: String,
    /// Physical location of the artifact under the trash root.
    pub location: PathBuf,
    pub original_path: PathBuf,
    pub kind: ItemKind,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub trashed_name: String,
    pub original_path: PathBuf,
    /// Where the item landed; a `_restored` sibling if the original was taken.
    pub destination: PathBuf,
    pub disambiguated: bool,
    /// Malformed manifest lines skipped while looking the item up.
    pub skipped_records: usize,
}

pub struct TrashEngine {
    fs: Arc<dyn FileSystem>,
    store: TrashStore,
    manifest: TrashManifest,
}

impl TrashEngine {
    /// Opens the trash that lives under `config.root` on the real filesystem.
    pub fn open(config: &ExplorerConfig) -> crate::Result<Self> {
        Self::new(config, Arc::new(RealFileSystem))
    }

    pub fn new(config: &ExplorerConfig, fs: Arc<dyn FileSystem>) -> crate::Result<Self> {
        if !fs.exists(&config.root) {
            return Err(CoreError::not_found(format!(
                "project root {}",
                sanitize_user_path(&config.root)
            )));
        }
        let root = fs.canonicalize(&config.root)?;
        let resolved = ExplorerConfig {
            root,
            ..config.clone()
        };
        Ok(Self {
            store: TrashStore::new(resolved.trash_root(), fs.clone()),
            manifest: TrashManifest::new(resolved.manifest_path(), fs.clone()),
            fs,
        })
    }

    pub fn store(&self) -> &TrashStore {
        &self.store
    }

    pub fn manifest(&self) -> &TrashManifest {
        &self.manifest
    }

    /// Moves `path` into the trash and records where it came from.
    pub fn trash(&self, path: &Path) -> crate::Result<TrashOutcome> {
        let original_path = self.resolve(path)?;
        let kind = ItemKind::from_metadata(&self.fs.symlink_metadata(&original_path)?);
        self.store.check_target(&original_path)?;
        TrashManifest::check_recordable(&original_path)?;

        let recorded = self.manifest.load()?;
        let moved = self.store.move_in(&original_path, &recorded)?;
        let trashed_name = moved.trashed_name;
        let timestamp = moved.timestamp;
        let location = self.store.artifact_path(&trashed_name);
        let entry = ManifestEntry::new(timestamp, trashed_name.clone(), original_path.clone());
        if let Err(err) = self.manifest.append(&entry) {
            return Err(CoreError::PartialFailure {
                action: "trash",
                hint: format!(
                    "the manifest was not updated; the item is at {} and belongs at {}",
                    location.display(),
                    original_path.display()
                ),
                source: Box::new(err),
            });
        }
        if let Some(err) = moved.leftover {
            warn!(original = %original_path.display(), %trashed_name, "source remains after copy");
            return Err(CoreError::PartialFailure {
                action: "trash",
                hint: format!(
                    "the item is recorded as {trashed_name} and can be restored, but parts of it \
                     remain at {}; remove them by hand",
                    original_path.display()
                ),
                source: Box::new(err),
            });
        }

        info!(original = %original_path.display(), %trashed_name, %kind, "trashed");
        Ok(TrashOutcome {
            trashed_name,
            location,
            original_path,
            kind,
            timestamp,
        })
    }

    /// Restores the most recently trashed item named `base_name`.
    pub fn restore(&self, base_name: &str) -> crate::Result<RestoreOutcome> {
        let snapshot = self.manifest.load()?;
        let entry = snapshot
            .most_recent_by_base_name(base_name)
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("nothing to restore for {base_name}")))?;

        let moved = match self.store.move_out(&entry.trashed_name, &entry.original_path) {
            Ok(moved) => moved,
            Err(CoreError::MissingArtifact(_)) => return Err(self.drop_stale(entry)),
            Err(err) => return Err(err),
        };
        let destination = moved.destination;

        if let Err(err) = self.manifest.remove(&entry) {
            return Err(CoreError::PartialFailure {
                action: "restore",
                hint: format!(
                    "the item is back at {}; the manifest still lists {}",
                    destination.display(),
                    entry.trashed_name
                ),
                source: Box::new(err),
            });
        }
        if let Some(err) = moved.leftover {
            return Err(CoreError::PartialFailure {
                action: "restore",
                hint: format!(
                    "the item is back at {}, but parts of {} remain in the trash; \
                     remove them by hand",
                    destination.display(),
                    self.store.artifact_path(&entry.trashed_name).display()
                ),
                source: Box::new(err),
            });
        }

        info!(
            trashed_name = %entry.trashed_name,
            destination = %destination.display(),
            "restored"
        );
        Ok(RestoreOutcome {
            disambiguated: destination != entry.original_path,
            trashed_name: entry.trashed_name,
            original_path: entry.original_path,
            destination,
            skipped_records: snapshot.skipped,
        })
    }

    /// Live manifest records, oldest first.
    pub fn entries(&self) -> crate::Result<ManifestSnapshot> {
        self.manifest.load()
    }

    /// The record outlived its artifact, so the item was already restored.
    fn drop_stale(&self, entry: ManifestEntry) -> CoreError {
        warn!(trashed_name = %entry.trashed_name, "manifest record has no artifact, dropping it");
        if let Err(err) = self.manifest.remove(&entry) {
            warn!(error = %err, "could not drop stale manifest record");
        }
        CoreError::AlreadyRestored {
            trashed_name: entry.trashed_name,
            original_path: entry.original_path,
        }
    }

    /// Absolute form of `path` that keeps a final symlink unresolved.
    fn resolve(&self, path: &Path) -> crate::Result<PathBuf> {
        if !self.fs.exists(path) {
            return Err(CoreError::not_found(sanitize_user_path(path)));
        }
        match path.file_name() {
            Some(name) => {
                let parent = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                Ok(self.fs.canonicalize(parent)?.join(name))
            }
            None => self.fs.canonicalize(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExitStatusLike;
    use crate::testing::StubFileSystem;
    use std::fs;
    use tempfile::TempDir;

    const NOW: u64 = 1_700_000_000;

    struct Fixture {
        temp: TempDir,
        stub: Arc<StubFileSystem>,
        engine: TrashEngine,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let stub = Arc::new(StubFileSystem::frozen_at(NOW));
            let fs: Arc<dyn FileSystem> = stub.clone();
            let engine = TrashEngine::new(&ExplorerConfig::new(temp.path()), fs).unwrap();
            Self { temp, stub, engine }
        }

        fn file(&self, relative: &str, content: &str) -> PathBuf {
            let path = self.root().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn root(&self) -> PathBuf {
            fs::canonicalize(self.temp.path()).unwrap()
        }

        fn artifacts(&self) -> Vec<String> {
            let mut names: Vec<String> = fs::read_dir(self.engine.store().root())
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .filter(|name| name != "manifest.tsv")
                .collect();
            names.sort();
            names
        }
    }

    #[test]
    fn trash_then_restore_round_trips() {
        let fx = Fixture::new();
        let path = fx.file("test.txt", "hello");

        let trashed = fx.engine.trash(&path).unwrap();
        assert_eq!(trashed.trashed_name, "1700000000__test.txt");
        assert_eq!(trashed.kind, ItemKind::File);
        assert_eq!(trashed.original_path, path);
        assert!(!path.exists());
        assert_eq!(fx.engine.entries().unwrap().entries.len(), 1);

        let restored = fx.engine.restore("test.txt").unwrap();
        assert_eq!(restored.destination, path);
        assert!(!restored.disambiguated);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
        assert!(fx.artifacts().is_empty());
        assert!(fx.engine.entries().unwrap().entries.is_empty());
    }

    #[test]
    fn same_name_same_second_are_both_restorable() {
        let fx = Fixture::new();
        let a = fx.file("left/a.txt", "left");
        let b = fx.file("right/a.txt", "right");

        let first = fx.engine.trash(&a).unwrap();
        let second = fx.engine.trash(&b).unwrap();
        assert_ne!(first.trashed_name, second.trashed_name);
        assert_eq!(fx.engine.entries().unwrap().entries.len(), 2);

        assert_eq!(fx.engine.restore("a.txt").unwrap().destination, b);
        assert_eq!(fx.engine.restore("a.txt").unwrap().destination, a);
        assert_eq!(fs::read_to_string(a).unwrap(), "left");
        assert_eq!(fs::read_to_string(b).unwrap(), "right");
    }

    #[test]
    fn most_recent_wins_and_older_record_stays() {
        let fx = Fixture::new();
        let path = fx.file("a.txt", "old");
        fx.engine.trash(&path).unwrap();
        fx.stub.set_time(NOW + 60);
        fs::write(&path, "new").unwrap();
        fx.engine.trash(&path).unwrap();

        fx.engine.restore("a.txt").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let remaining = fx.engine.entries().unwrap().entries;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].timestamp, NOW as i64);
        assert_eq!(fx.artifacts(), ["1700000000__a.txt"]);
    }

    #[test]
    fn restore_never_overwrites_an_occupant() {
        let fx = Fixture::new();
        let path = fx.file("a.txt", "trashed");
        fx.engine.trash(&path).unwrap();
        fs::write(&path, "occupant").unwrap();

        let restored = fx.engine.restore("a.txt").unwrap();

        assert!(restored.disambiguated);
        assert_eq!(restored.destination, fx.root().join("a_restored.txt"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "occupant");
        assert_eq!(fs::read_to_string(&restored.destination).unwrap(), "trashed");
    }

    #[test]
    fn restore_of_unknown_name_changes_nothing() {
        let fx = Fixture::new();
        let path = fx.file("kept.txt", "x");
        fx.engine.trash(&path).unwrap();
        let manifest_before = fs::read(fx.engine.manifest().path()).unwrap();

        assert!(matches!(
            fx.engine.restore("nonexistent"),
            Err(CoreError::NotFound(_))
        ));
        assert_eq!(fs::read(fx.engine.manifest().path()).unwrap(), manifest_before);
        assert_eq!(fx.artifacts(), ["1700000000__kept.txt"]);
    }

    #[test]
    fn manifest_matches_artifacts_after_mixed_operations() {
        let fx = Fixture::new();
        for (idx, name) in ["a", "b", "c", "d"].iter().enumerate() {
            fx.stub.set_time(NOW + idx as u64);
            let path = fx.file(name, name);
            fx.engine.trash(&path).unwrap();
        }
        fx.engine.restore("b").unwrap();
        fx.engine.restore("d").unwrap();

        let records: Vec<String> = fx
            .engine
            .entries()
            .unwrap()
            .entries
            .into_iter()
            .map(|e| e.trashed_name)
            .collect();
        assert_eq!(records, fx.artifacts());
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn refuses_trash_root_and_its_ancestors() {
        let fx = Fixture::new();
        fx.file("x.txt", "x");
        fx.engine.trash(&fx.root().join("x.txt")).unwrap();

        for target in [fx.engine.store().root().to_path_buf(), fx.root()] {
            assert!(matches!(
                fx.engine.trash(&target),
                Err(CoreError::InvalidTarget { .. })
            ));
        }
        assert!(matches!(
            fx.engine.trash(fx.engine.manifest().path()),
            Err(CoreError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn trash_of_missing_path_is_not_found() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.engine.trash(&fx.root().join("missing")),
            Err(CoreError::NotFound(_))
        ));
        assert!(!fx.engine.store().root().exists());
    }

    #[test]
    fn unrecorded_trash_is_a_partial_failure() {
        let fx = Fixture::new();
        let path = fx.file("orphan.txt", "data");
        fx.stub
            .fail_replace_of(Some(fx.engine.manifest().path().to_path_buf()));

        let err = fx.engine.trash(&path).unwrap_err();

        assert!(matches!(err, CoreError::PartialFailure { action: "trash", .. }));
        assert!(err.to_string().contains("1700000000__orphan.txt"));
        assert_eq!(fx.artifacts(), ["1700000000__orphan.txt"]);
        assert!(fx.engine.entries().unwrap().entries.is_empty());
    }

    #[test]
    fn restored_but_still_recorded_is_a_partial_failure() {
        let fx = Fixture::new();
        let path = fx.file("a.txt", "data");
        fx.engine.trash(&path).unwrap();
        fx.stub
            .fail_replace_of(Some(fx.engine.manifest().path().to_path_buf()));

        let err = fx.engine.restore("a.txt").unwrap_err();
        assert!(matches!(err, CoreError::PartialFailure { action: "restore", .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "data");

        fx.stub.fail_replace_of(None);
        assert!(matches!(
            fx.engine.restore("a.txt"),
            Err(CoreError::AlreadyRestored { .. })
        ));
        assert!(fx.engine.entries().unwrap().entries.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "data");
    }

    #[test]
    fn directories_and_relative_paths_are_resolved() {
        let fx = Fixture::new();
        fx.file("project/src/main.rs", "fn main() {}");
        let dir = fx.root().join("project");
        let relative = dir.join("src/..");

        let trashed = fx.engine.trash(&relative).unwrap();
        assert_eq!(trashed.kind, ItemKind::Directory);
        assert_eq!(trashed.original_path, dir);

        fx.engine.restore("project").unwrap();
        assert_eq!(
            fs::read_to_string(dir.join("src/main.rs")).unwrap(),
            "fn main() {}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_trashed_as_links() {
        let fx = Fixture::new();
        let target = fx.file("real.txt", "real");
        let link = fx.root().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let trashed = fx.engine.trash(&link).unwrap();

        assert_eq!(trashed.kind, ItemKind::Symlink);
        assert_eq!(trashed.original_path, link);
        assert!(target.exists());
        fx.engine.restore("link.txt").unwrap();
        assert_eq!(fs::read_to_string(&link).unwrap(), "real");
    }

    #[test]
    fn live_names_stay_unique_after_an_unrecorded_restore() {
        let fx = Fixture::new();
        let first = fx.file("one/a.txt", "one");
        let second = fx.file("two/a.txt", "two");
        fx.engine.trash(&first).unwrap();
        fx.stub
            .fail_replace_of(Some(fx.engine.manifest().path().to_path_buf()));
        assert!(matches!(
            fx.engine.restore("a.txt"),
            Err(CoreError::PartialFailure { action: "restore", .. })
        ));
        fx.stub.fail_replace_of(None);

        let trashed = fx.engine.trash(&second).unwrap();

        assert_eq!(trashed.trashed_name, "1700000000_1__a.txt");
        let names: Vec<String> = fx
            .engine
            .entries()
            .unwrap()
            .entries
            .into_iter()
            .map(|e| e.trashed_name)
            .collect();
        assert_eq!(names, ["1700000000__a.txt", "1700000000_1__a.txt"]);
        assert_eq!(fs::read_to_string(&first).unwrap(), "one");

        assert_eq!(fx.engine.restore("a.txt").unwrap().destination, second);
        assert_eq!(fs::read_to_string(&second).unwrap(), "two");
        assert!(matches!(
            fx.engine.restore("a.txt"),
            Err(CoreError::AlreadyRestored { .. })
        ));
        assert_eq!(fs::read_to_string(&first).unwrap(), "one");
    }

    #[test]
    fn copied_but_unremoved_source_is_recorded_and_reported() {
        let fx = Fixture::new();
        fx.file("album/a.jpg", "a");
        fx.file("album/b.jpg", "b");
        let album = fx.root().join("album");
        fx.stub.renames_cross_device(true);
        fx.stub.removals_fail_partway(true);

        let err = fx.engine.trash(&album).unwrap_err();

        assert!(matches!(err, CoreError::PartialFailure { action: "trash", .. }));
        assert!(err.to_string().contains("1700000000__album"));
        assert_eq!(err.exit_status(), ExitStatusLike::Warning);
        let entries = fx.engine.entries().unwrap().entries;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].original_path, album);
        assert_eq!(fx.artifacts(), ["1700000000__album"]);

        fx.stub.renames_cross_device(false);
        fx.stub.removals_fail_partway(false);
        let restored = fx.engine.restore("album").unwrap();
        assert!(restored.disambiguated);
        assert_eq!(restored.destination, fx.root().join("album_restored"));
        assert_eq!(fs::read_to_string(restored.destination.join("a.jpg")).unwrap(), "a");
        assert_eq!(fs::read_to_string(restored.destination.join("b.jpg")).unwrap(), "b");
        assert!(fx.engine.entries().unwrap().entries.is_empty());
    }

    #[test]
    fn restore_reports_an_artifact_left_in_the_trash() {
        let fx = Fixture::new();
        fx.file("album/a.jpg", "a");
        fx.file("album/b.jpg", "b");
        let album = fx.root().join("album");
        fx.engine.trash(&album).unwrap();
        fx.stub.renames_cross_device(true);
        fx.stub.removals_fail_partway(true);

        let err = fx.engine.restore("album").unwrap_err();

        assert!(matches!(err, CoreError::PartialFailure { action: "restore", .. }));
        assert_eq!(fs::read_to_string(album.join("a.jpg")).unwrap(), "a");
        assert_eq!(fs::read_to_string(album.join("b.jpg")).unwrap(), "b");
        assert!(fx.engine.entries().unwrap().entries.is_empty());
    }
}
