//! Filesystem double used by unit tests: real disk access with a frozen clock
//! and switchable failures.

use crate::fs::{FileSystem, RealFileSystem};
use crate::{CoreError, Result};
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

#[derive(Debug, Default)]
pub struct StubFileSystem {
    frozen: Mutex<Option<SystemTime>>,
    cross_device: AtomicBool,
    fail_copies: AtomicBool,
    partial_removals: AtomicBool,
    fail_replace_of: Mutex<Option<PathBuf>>,
}

impl StubFileSystem {
    /// A filesystem whose clock is stuck at `secs` after the epoch.
    pub fn frozen_at(secs: u64) -> Self {
        let stub = Self::default();
        stub.set_time(secs);
        stub
    }

    pub fn set_time(&self, secs: u64) {
        *self.frozen.lock().unwrap() = Some(UNIX_EPOCH + Duration::from_secs(secs));
    }

    /// Every rename fails as if source and target were on different devices.
    pub fn renames_cross_device(&self, on: bool) {
        self.cross_device.store(on, Ordering::SeqCst);
    }

    pub fn copies_fail(&self, on: bool) {
        self.fail_copies.store(on, Ordering::SeqCst);
    }

    /// Removals delete one file and then fail, as an interrupted recursive
    /// delete would.
    pub fn removals_fail_partway(&self, on: bool) {
        self.partial_removals.store(on, Ordering::SeqCst);
    }

    /// Atomic replaces of `path` fail with a permission error.
    pub fn fail_replace_of(&self, path: Option<PathBuf>) {
        *self.fail_replace_of.lock().unwrap() = path;
    }
}

#[cfg(unix)]
fn cross_device_error() -> io::Error {
    io::Error::from_raw_os_error(libc::EXDEV)
}

#[cfg(windows)]
fn cross_device_error() -> io::Error {
    io::Error::from_raw_os_error(17)
}

impl FileSystem for StubFileSystem {
    fn now(&self) -> SystemTime {
        self.frozen.lock().unwrap().unwrap_or_else(SystemTime::now)
    }

    fn exists(&self, path: &Path) -> bool {
        RealFileSystem.exists(path)
    }

    fn metadata(&self, path: &Path) -> Result<Metadata> {
        RealFileSystem.metadata(path)
    }

    fn symlink_metadata(&self, path: &Path) -> Result<Metadata> {
        RealFileSystem.symlink_metadata(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        RealFileSystem.canonicalize(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        RealFileSystem.create_dir_all(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        RealFileSystem.read_to_string(path)
    }

    fn replace_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        if self.fail_replace_of.lock().unwrap().as_deref() == Some(path) {
            return Err(CoreError::io(path, io::Error::from(io::ErrorKind::PermissionDenied)));
        }
        RealFileSystem.replace_atomic(path, data)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if self.cross_device.load(Ordering::SeqCst) {
            return Err(CoreError::io(from, cross_device_error()));
        }
        RealFileSystem.rename(from, to)
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> Result<()> {
        if self.fail_copies.load(Ordering::SeqCst) {
            // Leave a partial copy behind, as an interrupted copy would.
            RealFileSystem.create_dir_all(to)?;
            return Err(CoreError::io(to, io::Error::from(io::ErrorKind::Other)));
        }
        RealFileSystem.copy_tree(from, to)
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        if self.partial_removals.load(Ordering::SeqCst) {
            let first_file = WalkDir::new(path)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .find(|entry| !entry.file_type().is_dir());
            if let Some(entry) = first_file {
                RealFileSystem.remove_all(entry.path())?;
            }
            return Err(CoreError::io(path, io::Error::from(io::ErrorKind::PermissionDenied)));
        }
        RealFileSystem.remove_all(path)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        RealFileSystem.list_dir(path)
    }
}
