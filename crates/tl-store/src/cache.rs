//! Disposable per-task cache of parsed events.
//!
//! Every function here is best effort: failures are logged at debug level
//! and reported as a cache miss, never as an error.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tl_core::{Event, TaskName};

/// Bumped whenever the cached representation changes.
pub const CACHE_VERSION: u32 = 1;

/// Cache directory, relative to the data directory.
pub const CACHE_DIR: &str = ".cache";

#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord<'a> {
    version: u32,
    /// Modification time of the task file the events were parsed from.
    source_mtime: SystemTime,
    events: Cow<'a, [Event]>,
}

/// Returns the cache file path for `task` within `dir`.
pub fn cache_path(dir: &Path, task: &TaskName) -> PathBuf {
    dir.join(CACHE_DIR).join(format!("{task}.json"))
}

/// Returns the cached events for `task` if the cache is still valid for a
/// task file last modified at `source_mtime`.
pub fn load(dir: &Path, task: &TaskName, source_mtime: SystemTime) -> Option<Vec<Event>> {
    let path = cache_path(dir, task);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(%task, "no cache");
            return None;
        }
        Err(err) => {
            tracing::debug!(%task, %err, "failed to read cache");
            return None;
        }
    };

    let record: CacheRecord<'static> = match serde_json::from_slice(&bytes) {
        Ok(record) => record,
        Err(err) => {
            tracing::debug!(%task, %err, "corrupt cache");
            return None;
        }
    };

    if record.version != CACHE_VERSION {
        tracing::debug!(%task, version = record.version, "cache version mismatch");
        return None;
    }
    if source_mtime > record.source_mtime {
        tracing::debug!(%task, "stale cache");
        return None;
    }
    if record.events.iter().any(|event| event.task() != task) {
        tracing::debug!(%task, "cache holds events of another task");
        return None;
    }

    tracing::debug!(%task, count = record.events.len(), "cache hit");
    Some(record.events.into_owned())
}

/// Caches `events` as the parsed contents of a task file last modified at
/// `source_mtime`.
pub fn save(dir: &Path, task: &TaskName, source_mtime: SystemTime, events: &[Event]) {
    let path = cache_path(dir, task);
    let record = CacheRecord {
        version: CACHE_VERSION,
        source_mtime,
        events: Cow::Borrowed(events),
    };

    let result = path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| serde_json::to_vec(&record).map_err(io::Error::from))
        .and_then(|bytes| fs::write(&path, bytes));

    if let Err(err) = result {
        tracing::debug!(%task, %err, "failed to write cache");
    }
}

/// Removes the cache of `task`.
pub fn invalidate(dir: &Path, task: &TaskName) {
    match fs::remove_file(cache_path(dir, task)) {
        Ok(()) => tracing::debug!(%task, "cache invalidated"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => tracing::debug!(%task, %err, "failed to remove cache"),
    }
}
