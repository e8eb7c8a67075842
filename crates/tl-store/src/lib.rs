//! Storage layer for the tl time tracker.
//!
//! Events live in one plain-text file per task, `<task>.csv`, inside a data
//! directory. [`EventStore`] loads every task file into a single
//! start-ordered list, answers queries over it, and writes back only the
//! tasks it changed.
//!
//! # File Format
//!
//! Each task file is CSV with the header `start,delta,message`:
//!
//! ```text
//! start,delta,message
//! 2024-01-15T09:00:00Z,PT01H30M,wrote the parser
//! 2024-01-15T13:00:00Z,,
//! ```
//!
//! `start` is a UTC timestamp and `delta` an ISO 8601 duration. An empty
//! `delta` marks the running event.
//!
//! # Cache
//!
//! Parsed files are cached as JSON under `.cache/` in the data directory.
//! The cache is never authoritative: it is used only while its version
//! matches and the task file has not been modified since it was written,
//! and any failure to read or write it falls back to parsing.
//!
//! # Concurrency
//!
//! There is no locking. Two processes writing the same directory can lose
//! updates, and a reader racing a writer may see a stale cache.

use std::fmt;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tl_core::{ParseError, StopError, TaskName, ValidationError, format_timestamp};

pub mod cache;
mod check;
pub mod file;
pub mod marker;
mod store;

pub use check::Inconsistency;
pub use marker::{CurrentMarker, MarkerInfo};
pub use store::{EventStore, StoreOptions};

/// How a refused start conflicts with tracked time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningConflict {
    /// The task has been running since `since`.
    Active { since: DateTime<Utc> },
    /// The requested start is earlier than the end of the task's latest event.
    Overlap {
        start: DateTime<Utc>,
        previous_end: DateTime<Utc>,
    },
}

impl fmt::Display for RunningConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active { since } => {
                write!(f, "is already running since {}", format_timestamp(*since))
            }
            Self::Overlap {
                start,
                previous_end,
            } => write!(
                f,
                "cannot start at {}: previous event ends at {}",
                format_timestamp(*start),
                format_timestamp(*previous_end)
            ),
        }
    }
}

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Start was requested for a task with no history.
    #[error("task {task} does not exist")]
    TaskNotExist { task: TaskName },

    /// Start conflicts with time already tracked: a task is running, or
    /// an explicit start falls inside the task's previous event.
    #[error("{task} {conflict}")]
    TaskRunning {
        task: TaskName,
        conflict: RunningConflict,
    },

    /// Stop was requested with nothing running.
    #[error("no task is running")]
    TaskNotRunning,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Stop(#[from] StopError),

    /// A row in a task file could not be decoded.
    #[error("{}:{line}: {source}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        #[source]
        source: ParseError,
    },

    /// A task file does not start with the expected header.
    #[error("{}: expected header start,delta,message, found {found:?}", path.display())]
    Header { path: PathBuf, found: Vec<String> },

    /// Malformed CSV in a task file.
    #[error("{}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The operating system error behind this failure, if any.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => match source.kind() {
                csv::ErrorKind::Io(err) => Some(err),
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether this is a user-facing domain error rather than an I/O failure.
    pub fn is_domain(&self) -> bool {
        self.io_error().is_none()
    }
}
