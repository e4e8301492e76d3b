use crate::errors::CoreError;
use std::fs::{self, File, Metadata};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Filesystem abstraction boundary for the catalog, store and manifest.
///
/// Keeping this trait narrow makes it easy to write deterministic tests: the
/// clock lives here so same-second naming collisions can be reproduced, and
/// relocation primitives can be made to fail on demand.
pub trait FileSystem: Send + Sync {
    /// Returns the current time in wall-clock format.
    fn now(&self) -> SystemTime;

    /// Returns true when something occupies `path`. Dangling symlinks count.
    fn exists(&self, path: &Path) -> bool;

    /// Reads file metadata, following symlinks.
    fn metadata(&self, path: &Path) -> crate::Result<Metadata>;

    /// Reads symlink metadata.
    fn symlink_metadata(&self, path: &Path) -> crate::Result<Metadata>;

    /// Resolves a path to its canonical absolute form.
    fn canonicalize(&self, path: &Path) -> crate::Result<PathBuf>;

    /// Creates a directory and all missing parent directories.
    fn create_dir_all(&self, path: &Path) -> crate::Result<()>;

    /// Reads UTF-8 text.
    fn read_to_string(&self, path: &Path) -> crate::Result<String>;

    /// Replaces `path` with `data` by writing a temporary sibling and renaming
    /// it over the target, so readers never observe a truncated file.
    fn replace_atomic(&self, path: &Path, data: &[u8]) -> crate::Result<()>;

    /// Renames/moves a path. Fails across filesystems.
    fn rename(&self, from: &Path, to: &Path) -> crate::Result<()>;

    /// Copies a file, symlink or whole directory tree to `to`.
    fn copy_tree(&self, from: &Path, to: &Path) -> crate::Result<()>;

    /// Removes a file, symlink or whole directory tree.
    fn remove_all(&self, path: &Path) -> crate::Result<()>;

    /// Lists directory children as concrete paths.
    fn list_dir(&self, path: &Path) -> crate::Result<Vec<PathBuf>>;
}

/// Default filesystem implementation backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn metadata(&self, path: &Path) -> crate::Result<Metadata> {
        fs::metadata(path).map_err(|err| CoreError::io(path, err))
    }

    fn symlink_metadata(&self, path: &Path) -> crate::Result<Metadata> {
        fs::symlink_metadata(path).map_err(|err| CoreError::io(path, err))
    }

    fn canonicalize(&self, path: &Path) -> crate::Result<PathBuf> {
        fs::canonicalize(path).map_err(|err| CoreError::io(path, err))
    }

    fn create_dir_all(&self, path: &Path) -> crate::Result<()> {
        fs::create_dir_all(path).map_err(|err| CoreError::io(path, err))
    }

    fn read_to_string(&self, path: &Path) -> crate::Result<String> {
        fs::read_to_string(path).map_err(|err| CoreError::io(path, err))
    }

    fn replace_atomic(&self, path: &Path, data: &[u8]) -> crate::Result<()> {
        let tmp = temp_sibling(path);
        let written = File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(data)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&tmp, path));
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp);
            return Err(CoreError::io(path, err));
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> crate::Result<()> {
        fs::rename(from, to).map_err(|err| CoreError::io(from, err))
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> crate::Result<()> {
        for entry in WalkDir::new(from).follow_links(false).follow_root_links(false) {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(from).to_path_buf();
                CoreError::io(path, io::Error::from(err))
            })?;
            let relative = entry.path().strip_prefix(from).unwrap_or(Path::new(""));
            let target = if relative.as_os_str().is_empty() {
                to.to_path_buf()
            } else {
                to.join(relative)
            };
            copy_entry(entry.path(), &target, entry.file_type())?;
        }
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> crate::Result<()> {
        let metadata = self.symlink_metadata(path)?;
        if metadata.is_dir() {
            fs::remove_dir_all(path).map_err(|err| CoreError::io(path, err))
        } else {
            fs::remove_file(path).map_err(|err| CoreError::io(path, err))
        }
    }

    fn list_dir(&self, path: &Path) -> crate::Result<Vec<PathBuf>> {
        fs::read_dir(path)
            .map_err(|err| CoreError::io(path, err))?
            .map(|entry| entry.map(|v| v.path()))
            .collect::<Result<Vec<PathBuf>, io::Error>>()
            .map_err(|err| CoreError::io(path, err))
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

/// True when `candidate` is a temp file `replace_atomic` writes for `target`,
/// whichever process wrote it.
pub(crate) fn is_temp_sibling_of(candidate: &Path, target: &Path) -> bool {
    if candidate.parent() != target.parent() {
        return false;
    }
    let (Some(candidate), Some(target)) = (
        candidate.file_name().and_then(|n| n.to_str()),
        target.file_name().and_then(|n| n.to_str()),
    ) else {
        return false;
    };
    candidate
        .strip_prefix(target)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.strip_suffix(".tmp"))
        .is_some_and(|pid| !pid.is_empty() && pid.bytes().all(|b| b.is_ascii_digit()))
}

fn copy_entry(from: &Path, to: &Path, file_type: fs::FileType) -> crate::Result<()> {
    if file_type.is_dir() {
        fs::create_dir(to).map_err(|err| CoreError::io(to, err))
    } else if file_type.is_symlink() {
        let target = fs::read_link(from).map_err(|err| CoreError::io(from, err))?;
        symlink(&target, to).map_err(|err| CoreError::io(to, err))
    } else {
        fs::copy(from, to)
            .map(|_| ())
            .map_err(|err| CoreError::io(from, err))
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(not(any(unix, windows)))]
fn symlink(_target: &Path, link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot recreate symlink {}", link.display()),
    ))
}
