use std::{io, path::PathBuf};

use crate::models::ExitStatusLike;

/// Shared error type for the explorer library and its command binary.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    /// File system I/O failure, including manifest reads and writes.
    #[error("I/O error while accessing {0}")]
    Io(PathBuf, #[source] io::Error),

    /// The target path or manifest record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation would act on the trash root itself.
    #[error("refusing to operate on {path}: {reason}")]
    InvalidTarget { path: PathBuf, reason: String },

    /// Moving an item into the trash failed; the source is untouched.
    #[error("could not move {path} into the trash")]
    TrashMove {
        path: PathBuf,
        #[source]
        source: Box<CoreError>,
    },

    /// Moving an item out of the trash failed; the artifact is untouched.
    #[error("could not restore {trashed_name} to {destination}")]
    RestoreMove {
        trashed_name: String,
        destination: PathBuf,
        #[source]
        source: Box<CoreError>,
    },

    /// The destination's parent directory is missing and could not be created.
    #[error("parent directory {0} is missing and could not be created")]
    ParentMissing(PathBuf, #[source] Box<CoreError>),

    /// A manifest record points at an artifact that is not in the trash root.
    #[error("trashed item {0} is missing from the trash")]
    MissingArtifact(String),

    /// A stale manifest record was found for an item restored earlier.
    #[error("{trashed_name} was already restored (stale record for {original_path} dropped)")]
    AlreadyRestored {
        trashed_name: String,
        original_path: PathBuf,
    },

    /// The item moved, but the manifest or the move's cleanup lagged behind.
    #[error("{action} only partly completed; {hint}")]
    PartialFailure {
        action: &'static str,
        hint: String,
        #[source]
        source: Box<CoreError>,
    },

    /// An operation was rejected due to argument issues.
    #[error("invalid command input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_target(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        Self::Io(path.into(), error)
    }

    /// True when the underlying OS error reports a rename across filesystems.
    pub fn is_cross_device(&self) -> bool {
        match self {
            Self::Io(_, err) => err.raw_os_error().is_some_and(is_cross_device_code),
            _ => false,
        }
    }

    /// Exit status the command boundary reports for this error.
    pub fn exit_status(&self) -> ExitStatusLike {
        match self {
            Self::PartialFailure { .. } | Self::AlreadyRestored { .. } => ExitStatusLike::Warning,
            _ => ExitStatusLike::Error,
        }
    }
}

#[cfg(unix)]
fn is_cross_device_code(code: i32) -> bool {
    code == libc::EXDEV
}

#[cfg(windows)]
fn is_cross_device_code(code: i32) -> bool {
    // ERROR_NOT_SAME_DEVICE
    code == 17
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device_code(_code: i32) -> bool {
    false
}

/// Shared result alias for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
