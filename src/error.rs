//! Error types for reading and decoding the control file.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for control-file operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Classification of I/O failures while reading the control file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoErrorKind {
    NotFound,
    PermissionDenied,
    /// Short read or a failed read after a successful open.
    Truncated,
    /// The read did not finish within the configured time budget.
    Timeout,
    Other,
}

impl IoErrorKind {
    /// Classify an open() failure.
    pub fn from_open(e: &io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => IoErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => IoErrorKind::PermissionDenied,
            _ => IoErrorKind::Other,
        }
    }
}

impl fmt::Display for IoErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IoErrorKind::NotFound => "not found",
            IoErrorKind::PermissionDenied => "permission denied",
            IoErrorKind::Truncated => "truncated",
            IoErrorKind::Timeout => "timeout",
            IoErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Errors produced by the reader and the decoder.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Open/read failure. `detail` carries the OS diagnostic text verbatim.
    #[error("{}", io_message(*kind, path, detail))]
    Io {
        kind: IoErrorKind,
        path: PathBuf,
        detail: String,
    },

    /// The record was read but the stored CRC does not match.
    /// May be a torn read of a concurrently rewritten file; callers may retry.
    #[error(
        "calculated CRC checksum does not match value stored in file \
         (stored {stored:#010x}, calculated {calculated:#010x})"
    )]
    Checksum { stored: u32, calculated: u32 },

    /// Buffer shorter than the fixed record size (or inconsistent layout).
    #[error("malformed control record: expected {expected} bytes, got {actual}")]
    MalformedRecord { expected: usize, actual: usize },

    /// pg_control_version differs from the single pinned layout.
    #[error("unsupported pg_control version {found} (expected {expected}){}", hint_suffix(hint))]
    UnsupportedVersion {
        found: u32,
        expected: u32,
        hint: Option<String>,
    },
}

impl ControlError {
    pub(crate) fn io(kind: IoErrorKind, path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        ControlError::Io {
            kind,
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// true: повтор вызова может помочь (torn read или истёкший бюджет времени).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ControlError::Checksum { .. }
                | ControlError::Io {
                    kind: IoErrorKind::Timeout,
                    ..
                }
        )
    }

    /// I/O kind, if this is an I/O error.
    pub fn io_kind(&self) -> Option<IoErrorKind> {
        match self {
            ControlError::Io { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

fn io_message(kind: IoErrorKind, path: &Path, detail: &str) -> String {
    match kind {
        IoErrorKind::NotFound | IoErrorKind::PermissionDenied | IoErrorKind::Other => format!(
            "could not open file \"{}\" for reading: {}",
            path.display(),
            detail
        ),
        IoErrorKind::Truncated => {
            format!("could not read file \"{}\": {}", path.display(), detail)
        }
        IoErrorKind::Timeout => {
            format!("timed out reading file \"{}\": {}", path.display(), detail)
        }
    }
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(h) => format!("; {}", h),
        None => String::new(),
    }
}
