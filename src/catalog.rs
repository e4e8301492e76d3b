//! Read-only introspection behind `list`, `info`, `tree`, `search` and `du`.

use crate::errors::CoreError;
use crate::fs::FileSystem;
use crate::helpers::base_name;
use crate::models::ItemKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ListedEntry {
    pub name: String,
    pub kind: ItemKind,
}

impl ListedEntry {
    /// Name as printed by `list`; directories get a trailing slash.
    pub fn display_name(&self) -> String {
        match self.kind {
            ItemKind::Directory => format!("{}/", self.name),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PathInfo {
    pub path: PathBuf,
    pub kind: ItemKind,
    /// File length, or the summed size of everything below a directory.
    pub size: u64,
    pub created: Option<SystemTime>,
    pub modified: Option<SystemTime>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SizeEntry {
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct DiskUsage {
    pub entries: Vec<SizeEntry>,
    pub total: u64,
}

pub struct PathCatalog {
    fs: Arc<dyn FileSystem>,
}

impl PathCatalog {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Entries of `dir` sorted by name; dotfiles only with `include_hidden`.
    pub fn list(&self, dir: &Path, include_hidden: bool) -> crate::Result<Vec<ListedEntry>> {
        self.require_dir(dir)?;
        let mut entries = Vec::new();
        for path in self.sorted_children(dir)? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !include_hidden && name.starts_with('.') {
                continue;
            }
            let kind = ItemKind::from_metadata(&self.fs.symlink_metadata(&path)?);
            entries.push(ListedEntry { name, kind });
        }
        Ok(entries)
    }

    pub fn info(&self, path: &Path) -> crate::Result<PathInfo> {
        let metadata = self.stat(path)?;
        let kind = ItemKind::from_metadata(&metadata);
        let size = match kind {
            ItemKind::Directory => self.size_of(path),
            _ => metadata.len(),
        };
        Ok(PathInfo {
            path: path.to_path_buf(),
            kind,
            size,
            created: metadata.created().ok(),
            modified: metadata.modified().ok(),
        })
    }

    /// Renders the nested structure under `dir`, one line per entry.
    pub fn tree(&self, dir: &Path) -> crate::Result<Vec<String>> {
        self.require_dir(dir)?;
        let mut lines = vec![format!("{}/", dir.display().to_string().trim_end_matches('/'))];
        self.render_children(dir, "", &mut lines);
        Ok(lines)
    }

    fn render_children(&self, dir: &Path, prefix: &str, lines: &mut Vec<String>) {
        let children = match self.sorted_children(dir) {
            Ok(children) => children,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "cannot read directory");
                return;
            }
        };
        let count = children.len();
        for (idx, child) in children.iter().enumerate() {
            let last = idx + 1 == count;
            let connector = if last { "└── " } else { "├── " };
            let name = child
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let is_dir = self
                .fs
                .symlink_metadata(child)
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if is_dir {
                lines.push(format!("{prefix}{connector}{name}/"));
                let nested = format!("{prefix}{}", if last { "    " } else { "│   " });
                self.render_children(child, &nested, lines);
            } else {
                lines.push(format!("{prefix}{connector}{name}"));
            }
        }
    }

    /// Every path below `dir` whose name contains `needle`, ignoring case.
    pub fn search(&self, dir: &Path, needle: &str) -> crate::Result<Vec<PathBuf>> {
        self.require_dir(dir)?;
        let needle = needle.to_lowercase();
        let matches = walk(dir)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .to_lowercase()
                    .contains(&needle)
            })
            .map(|entry| entry.into_path())
            .collect();
        Ok(matches)
    }

    /// Size of a file, or of each child of a directory plus the total. With
    /// `all`, every file and subdirectory below a directory is reported.
    pub fn disk_usage(&self, path: &Path, all: bool) -> crate::Result<DiskUsage> {
        let metadata = self.stat(path)?;
        if !metadata.is_dir() {
            return Ok(DiskUsage {
                entries: Vec::new(),
                total: metadata.len(),
            });
        }

        let children: Vec<PathBuf> = if all {
            walk(path).map(|entry| entry.into_path()).collect()
        } else {
            self.sorted_children(path)?
        };
        let entries = children
            .into_iter()
            .map(|child| SizeEntry {
                bytes: self.size_of(&child),
                path: child,
            })
            .collect();
        Ok(DiskUsage {
            entries,
            total: self.size_of(path),
        })
    }

    /// Summed length of every non-directory entry at or below `path`.
    /// Symlinks count as themselves and are never followed.
    pub fn size_of(&self, path: &Path) -> u64 {
        WalkDir::new(path)
            .follow_links(false)
            .follow_root_links(false)
            .into_iter()
            .filter_map(|entry| entry.inspect_err(log_walk_error).ok())
            .filter(|entry| !entry.file_type().is_dir())
            .filter_map(|entry| entry.metadata().ok())
            .map(|metadata| metadata.len())
            .sum()
    }

    fn stat(&self, path: &Path) -> crate::Result<std::fs::Metadata> {
        if !self.fs.exists(path) {
            return Err(CoreError::not_found(path.display().to_string()));
        }
        self.fs.symlink_metadata(path)
    }

    /// A symlink to a directory is accepted here.
    fn require_dir(&self, dir: &Path) -> crate::Result<()> {
        self.stat(dir)?;
        if !self.fs.metadata(dir)?.is_dir() {
            return Err(CoreError::invalid_input(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        Ok(())
    }

    fn sorted_children(&self, dir: &Path) -> crate::Result<Vec<PathBuf>> {
        let mut children = self.fs.list_dir(dir)?;
        children.sort_by(|a, b| base_name(a).cmp(&base_name(b)).then_with(|| a.cmp(b)));
        Ok(children)
    }
}

fn walk(dir: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.inspect_err(log_walk_error).ok())
}

fn log_walk_error(err: &walkdir::Error) {
    warn!(error = %err, "skipping unreadable entry");
}
