//! Durable log of trash operations, stored as `manifest.tsv` in the trash root.
//!
//! Each line is `<unix_timestamp>\t<trashed_name>\t<original_absolute_path>`.
//! Every mutation rewrites the whole file through an atomic replace, so an
//! interrupted process leaves either the old or the new manifest on disk.
//! There is no cross-process locking: two invocations racing on `rm` or
//! `restore` can lose one of their updates.

use crate::errors::CoreError;
use crate::fs::{is_temp_sibling_of, FileSystem};
use crate::helpers::split_trashed_name;
use crate::models::ManifestEntry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const FIELD_SEPARATOR: char = '\t';

/// Parsed view of the manifest at one point in time.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ManifestSnapshot {
    /// Valid records in file order.
    pub entries: Vec<ManifestEntry>,
    /// Malformed lines that were skipped while reading.
    pub skipped: usize,
}

impl ManifestSnapshot {
    /// Latest record whose base name equals `base_name`; on equal timestamps
    /// the record appended last wins.
    pub fn most_recent_by_base_name(&self, base_name: &str) -> Option<&ManifestEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.base_name() == Some(base_name))
            .fold(None, |best: Option<&ManifestEntry>, entry| match best {
                Some(current) if current.timestamp > entry.timestamp => Some(current),
                _ => Some(entry),
            })
    }

    /// Whether some live record already uses `trashed_name`.
    pub fn records(&self, trashed_name: &str) -> bool {
        self.entries.iter().any(|entry| entry.trashed_name == trashed_name)
    }
}

pub struct TrashManifest {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl TrashManifest {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every valid record. A manifest that does not exist yet is empty.
    pub fn load(&self) -> crate::Result<ManifestSnapshot> {
        let mut snapshot = ManifestSnapshot::default();
        for (number, raw) in self.read_raw()?.split_inclusive('\n').enumerate() {
            let line = trim_line_ending(raw);
            if line.is_empty() {
                continue;
            }
            match parse_line(line) {
                Ok(entry) => snapshot.entries.push(entry),
                Err(reason) => {
                    warn!(
                        manifest = %self.path.display(),
                        line = number + 1,
                        reason,
                        "skipping malformed manifest record"
                    );
                    snapshot.skipped += 1;
                }
            }
        }
        Ok(snapshot)
    }

    /// Adds one record and persists it before returning.
    pub fn append(&self, entry: &ManifestEntry) -> crate::Result<()> {
        let line = format_line(entry)?;
        let mut content = self.read_raw()?;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&line);

        if let Some(parent) = self.path.parent() {
            self.fs.create_dir_all(parent)?;
        }
        self.sweep_stale_temps();
        self.fs.replace_atomic(&self.path, content.as_bytes())?;
        debug!(trashed_name = %entry.trashed_name, "manifest record appended");
        Ok(())
    }

    pub fn find_most_recent_by_base_name(
        &self,
        base_name: &str,
    ) -> crate::Result<Option<ManifestEntry>> {
        Ok(self.load()?.most_recent_by_base_name(base_name).cloned())
    }

    /// Deletes exactly one record equal to `entry`, keeping every other line
    /// byte-for-byte and in order.
    pub fn remove(&self, entry: &ManifestEntry) -> crate::Result<()> {
        if !self.fs.exists(&self.path) {
            return Err(CoreError::not_found(format!(
                "manifest record for {}",
                entry.trashed_name
            )));
        }
        let content = self.fs.read_to_string(&self.path)?;
        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let position = lines
            .iter()
            .rposition(|raw| parse_line(trim_line_ending(raw)).as_ref() == Ok(entry))
            .ok_or_else(|| {
                CoreError::not_found(format!("manifest record for {}", entry.trashed_name))
            })?;

        let rewritten: String = lines
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != position)
            .map(|(_, raw)| *raw)
            .collect();
        self.sweep_stale_temps();
        self.fs.replace_atomic(&self.path, rewritten.as_bytes())?;
        debug!(trashed_name = %entry.trashed_name, "manifest record removed");
        Ok(())
    }

    /// Rejects paths that the line format cannot hold. Checked before an
    /// item is moved so it never ends up trashed but unrecorded.
    pub fn check_recordable(path: &Path) -> crate::Result<&str> {
        let text = path
            .to_str()
            .ok_or_else(|| CoreError::invalid_target(path, "path is not valid UTF-8"))?;
        if has_line_structure(text) {
            return Err(CoreError::invalid_target(
                path,
                "tabs and line breaks cannot be recorded in the manifest",
            ));
        }
        Ok(text)
    }

    /// Deletes temp files left next to the manifest by an interrupted
    /// replace. Failures here never block the mutation itself.
    fn sweep_stale_temps(&self) {
        let Some(parent) = self.path.parent() else {
            return;
        };
        let Ok(children) = self.fs.list_dir(parent) else {
            return;
        };
        for child in children.iter().filter(|c| is_temp_sibling_of(c, &self.path)) {
            match self.fs.remove_all(child) {
                Ok(()) => warn!(temp = %child.display(), "removed stale manifest temp file"),
                Err(err) => warn!(temp = %child.display(), error = %err, "stale temp file remains"),
            }
        }
    }

    fn read_raw(&self) -> crate::Result<String> {
        if self.fs.exists(&self.path) {
            self.fs.read_to_string(&self.path)
        } else {
            Ok(String::new())
        }
    }
}

fn trim_line_ending(raw: &str) -> &str {
    let line = raw.strip_suffix('\n').unwrap_or(raw);
    line.strip_suffix('\r').unwrap_or(line)
}

fn parse_line(line: &str) -> Result<ManifestEntry, &'static str> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    let [timestamp, trashed_name, original_path] = fields.as_slice() else {
        return Err("expected three tab-separated fields");
    };
    let timestamp = timestamp
        .parse::<i64>()
        .map_err(|_| "timestamp is not an integer")?;
    if trashed_name.contains(['/', '\\']) || split_trashed_name(trashed_name).is_none() {
        return Err("trashed name is not <timestamp>__<name>");
    }
    let original_path = Path::new(original_path);
    if !original_path.is_absolute() {
        return Err("original path is not absolute");
    }
    Ok(ManifestEntry::new(timestamp, *trashed_name, original_path))
}

fn format_line(entry: &ManifestEntry) -> crate::Result<String> {
    let original = TrashManifest::check_recordable(&entry.original_path)?;
    if has_line_structure(&entry.trashed_name) {
        return Err(CoreError::invalid_target(
            &entry.original_path,
            "tabs and line breaks cannot be recorded in the manifest",
        ));
    }
    Ok(format!(
        "{}{sep}{}{sep}{}\n",
        entry.timestamp,
        entry.trashed_name,
        original,
        sep = FIELD_SEPARATOR
    ))
}

fn has_line_structure(s: &str) -> bool {
    s.contains([FIELD_SEPARATOR, '\n', '\r'])
}
