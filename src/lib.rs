//! Filesystem exploration with a reversible trash.
//!
//! Read-only commands go through [`PathCatalog`]. `rm` and `restore` go
//! through [`TrashEngine`], which moves items under `.trash/` and keeps a
//! tab-separated manifest of where each one came from.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod helpers;
pub mod manifest;
pub mod models;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{DiskUsage, ListedEntry, PathCatalog, PathInfo, SizeEntry};
pub use config::{ExplorerConfig, MANIFEST_NAME, ROOT_ENV_VAR, TRASH_DIR_NAME};
pub use engine::{RestoreOutcome, TrashEngine, TrashOutcome};
pub use errors::{CoreError, Result};
pub use fs::{FileSystem, RealFileSystem};
pub use helpers::{
    format_timestamp,
    print_size,
    sanitize_user_path,
    serialize_system_time,
    DISPLAY_TIME_FORMAT,
};
pub use manifest::{ManifestSnapshot, TrashManifest};
pub use models::{CommandKind, ExitStatusLike, ItemKind, ManifestEntry};
pub use store::{MovedIn, MovedOut, TrashStore};

