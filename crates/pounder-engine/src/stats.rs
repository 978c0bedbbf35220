use std::fmt;
use std::path::{Path, PathBuf};

use pounder_gateway::GatewayError;
use serde::Serialize;
use tracing::warn;

use crate::ops::OpKind;

/// Storage gateway call counters. Monotonic for the life of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub files_written: u64,
    pub files_deleted: u64,
    pub files_read: u64,
    /// Writes to a path already in the shadow model. Also counted in `files_written`.
    pub files_overwritten: u64,
    pub directories_made: u64,
    pub directories_deleted: u64,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Written {}, deleted {}, read {}, overwritten {}, made {} directories and deleted {}",
            self.files_written,
            self.files_deleted,
            self.files_read,
            self.files_overwritten,
            self.directories_made,
            self.directories_deleted
        )
    }
}

/// Something the engine observed that it did not expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// A gateway call failed.
    OperationFailed {
        op: OpKind,
        path: PathBuf,
        message: String,
    },
    /// A write failed; `overwrite` tells whether the path was already recorded.
    WriteFailed {
        op: OpKind,
        path: PathBuf,
        overwrite: bool,
        message: String,
    },
    /// A read succeeded but returned something other than the last write.
    ContentMismatch {
        op: OpKind,
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl Anomaly {
    pub fn operation_failed(op: OpKind, path: &Path, err: &GatewayError) -> Self {
        Anomaly::OperationFailed {
            op,
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn write_failed(op: OpKind, path: &Path, overwrite: bool, err: &GatewayError) -> Self {
        Anomaly::WriteFailed {
            op,
            path: path.to_path_buf(),
            overwrite,
            message: err.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Anomaly::OperationFailed { path, .. }
            | Anomaly::WriteFailed { path, .. }
            | Anomaly::ContentMismatch { path, .. } => path,
        }
    }

    pub fn op(&self) -> OpKind {
        match self {
            Anomaly::OperationFailed { op, .. }
            | Anomaly::WriteFailed { op, .. }
            | Anomaly::ContentMismatch { op, .. } => *op,
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::OperationFailed { op, path, message } => {
                write!(f, "{} failed on {} with {}", op, path.display(), message)
            }
            Anomaly::WriteFailed {
                op,
                path,
                overwrite,
                message,
            } => {
                let status = if *overwrite {
                    "was being overwritten"
                } else {
                    "was new"
                };
                write!(
                    f,
                    "{}: write failed on file {}, which {}. {}",
                    op,
                    path.display(),
                    status,
                    message
                )
            }
            Anomaly::ContentMismatch {
                op,
                path,
                expected,
                actual,
            } => write!(
                f,
                "{}: wrong content read from {}\nshould have been\n{}\nbut was\n{}",
                op,
                path.display(),
                expected,
                actual
            ),
        }
    }
}

/// Counters plus the ordered error log.
#[derive(Debug, Clone, Default)]
pub struct Collector {
    pub stats: Stats,
    errors: Vec<Anomaly>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an anomaly to the log. Never fails, never stops the run.
    pub fn record(&mut self, anomaly: Anomaly) {
        warn!(op = %anomaly.op(), path = %anomaly.path().display(), "{}", anomaly);
        self.errors.push(anomaly);
    }

    pub fn errors(&self) -> &[Anomaly] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// One-line status summary.
    pub fn summary(&self) -> String {
        format!("{}, {} errors", self.stats, self.errors.len())
    }
}
