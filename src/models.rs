use crate::helpers::split_trashed_name;
use std::fs::Metadata;
use std::path::PathBuf;

/// Command surface exposed by the `os-explorer` binary.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum CommandKind {
    List,
    Info,
    Tree,
    Search,
    Remove,
    Restore,
    DiskUsage,
    Trashed,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Info => "info",
            Self::Tree => "tree",
            Self::Search => "search",
            Self::Remove => "rm",
            Self::Restore => "restore",
            Self::DiskUsage => "du",
            Self::Trashed => "trashed",
        }
    }

    /// Whether the command can change anything on disk.
    pub fn mutates(&self) -> bool {
        matches!(self, Self::Remove | Self::Restore)
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a path is, judged without following a final symlink.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ItemKind {
    File,
    Directory,
    Symlink,
}

impl ItemKind {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else {
            Self::File
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of the trash manifest.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ManifestEntry {
    pub timestamp: i64,
    pub trashed_name: String,
    pub original_path: PathBuf,
}

impl ManifestEntry {
    pub fn new(
        timestamp: i64,
        trashed_name: impl Into<String>,
        original_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            timestamp,
            trashed_name: trashed_name.into(),
            original_path: original_path.into(),
        }
    }

    /// The original base name encoded after the timestamp prefix.
    pub fn base_name(&self) -> Option<&str> {
        split_trashed_name(&self.trashed_name).map(|(_, base)| base)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExitStatusLike {
    Ok,
    Warning,
    Error,
}

impl ExitStatusLike {
    pub fn as_code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Warning => 2,
            Self::Error => 1,
        }
    }
}
