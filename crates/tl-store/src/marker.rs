//! The `.current` marker file.
//!
//! Mutating commands hold a [`CurrentMarker`] while they run. The marker is
//! written on acquisition and removed by [`CurrentMarker::release`]; a
//! command that fails or crashes leaves it behind, which `fsck` reports.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tl_core::{codec, format_timestamp, parse_timestamp};

use crate::StoreError;

/// Name of the marker file inside the data directory.
pub const MARKER_FILE: &str = ".current";

/// Guard over the marker file.
#[derive(Debug)]
#[must_use = "dropping the marker without release() leaves it on disk"]
pub struct CurrentMarker {
    path: PathBuf,
}

/// Contents of a marker left on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerInfo {
    pub command: String,
    pub since: Option<DateTime<Utc>>,
}

impl CurrentMarker {
    /// Writes the marker for `command`, creating `dir` if needed.
    pub fn acquire(dir: &Path, command: &str) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(|err| StoreError::io(dir, err))?;
        let path = dir.join(MARKER_FILE);
        let contents = format!("{command} {}\n", format_timestamp(codec::now()));
        fs::write(&path, contents).map_err(|err| StoreError::io(&path, err))?;
        tracing::debug!(command, path = %path.display(), "marker acquired");
        Ok(Self { path })
    }

    /// Removes the marker.
    pub fn release(self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(StoreError::io(&self.path, err)),
        }
        tracing::debug!(path = %self.path.display(), "marker released");
        Ok(())
    }

    /// Reads a marker left in `dir`, if there is one.
    pub fn inspect(dir: &Path) -> Result<Option<MarkerInfo>, StoreError> {
        let path = dir.join(MARKER_FILE);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::io(&path, err)),
        };

        let line = contents.trim_end();
        let (command, since) = match line.rsplit_once(' ') {
            Some((command, stamp)) => match parse_timestamp(stamp) {
                Ok(since) if !stamp.is_empty() => (command, Some(since)),
                _ => (line, None),
            },
            None => (line, None),
        };

        Ok(Some(MarkerInfo {
            command: command.to_string(),
            since,
        }))
    }
}
