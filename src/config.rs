use std::path::PathBuf;

/// Directory, under the project root, that holds trashed items.
pub const TRASH_DIR_NAME: &str = ".trash";

/// Manifest file name inside the trash root.
pub const MANIFEST_NAME: &str = "manifest.tsv";

/// Environment variable overriding the project root.
pub const ROOT_ENV_VAR: &str = "OS_EXPLORER_ROOT";

/// Where the trash root lives and what its files are called.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExplorerConfig {
    /// Directory hosting the trash root; the working directory by default.
    pub root: PathBuf,
    pub trash_dir_name: String,
    pub manifest_name: String,
}

impl ExplorerConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            trash_dir_name: TRASH_DIR_NAME.to_string(),
            manifest_name: MANIFEST_NAME.to_string(),
        }
    }

    pub fn with_trash_dir_name(mut self, name: impl Into<String>) -> Self {
        self.trash_dir_name = name.into();
        self
    }

    pub fn trash_root(&self) -> PathBuf {
        self.root.join(&self.trash_dir_name)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.trash_root().join(&self.manifest_name)
    }
}
