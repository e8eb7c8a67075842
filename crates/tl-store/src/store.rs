//! The in-memory event store and its persistence.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::ops::Index;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, SubsecRound, Utc, Weekday};
use tl_core::{Event, TaskName, codec};

use crate::{RunningConflict, StoreError, cache, file};

/// Options for [`EventStore::context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Refresh the cache of task files that had to be parsed.
    pub write_cache: bool,
    /// Keep the previous version of each rewritten file as `<task>.csv~`.
    pub backup: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            write_cache: true,
            backup: false,
        }
    }
}

/// All events of all tasks, ordered by start time.
///
/// Tasks whose events changed since the store was read are tracked as dirty
/// and are the only ones [`EventStore::write`] touches. At most one event in
/// the store is running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStore {
    events: Vec<Event>,
    dirty: BTreeSet<TaskName>,
}

impl EventStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `events`, sorted by start time.
    ///
    /// Events with equal start times keep their relative order. Nothing is
    /// marked dirty.
    pub fn from_events(mut events: Vec<Event>) -> Self {
        events.sort_by_key(Event::start);
        Self {
            events,
            dirty: BTreeSet::new(),
        }
    }

    // ========== Persistence ==========

    /// Reads every task file in `dir`.
    ///
    /// A missing directory is an empty store. Each task is loaded from its
    /// cache when that is still valid and parsed otherwise; with
    /// `write_cache` a parsed file refreshes the cache.
    pub fn read(dir: &Path, write_cache: bool) -> Result<Self, StoreError> {
        let files = match task_files(dir) {
            Ok(files) => files,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(dir = %dir.display(), "data directory missing");
                return Ok(Self::default());
            }
            Err(err) => return Err(StoreError::io(dir, err)),
        };

        let mut events = Vec::new();
        for (task, path) in files {
            events.extend(load_task(dir, &task, &path, write_cache)?);
        }

        tracing::debug!(dir = %dir.display(), count = events.len(), "store read");
        Ok(Self::from_events(events))
    }

    /// Writes every dirty task to its file in `dir`.
    ///
    /// Returns the number of files written, which is zero without any I/O
    /// when nothing is dirty. With `backup` an existing file is first
    /// renamed to `<task>.csv~`. The dirty set is cleared only once every
    /// file has been written.
    pub fn write(&mut self, dir: &Path, backup: bool) -> Result<usize, StoreError> {
        if self.dirty.is_empty() {
            return Ok(0);
        }

        fs::create_dir_all(dir).map_err(|err| StoreError::io(dir, err))?;

        for task in &self.dirty {
            let path = file::data_path(dir, task);
            if backup && path.exists() {
                let backup_path = file::backup_path(dir, task);
                fs::rename(&path, &backup_path).map_err(|err| StoreError::io(&path, err))?;
                tracing::debug!(%task, backup = %backup_path.display(), "previous file backed up");
            }

            file::write_events(&path, self.events.iter().filter(|e| e.task() == task))?;
            cache::invalidate(dir, task);
            tracing::info!(%task, path = %path.display(), "task file written");
        }

        let written = self.dirty.len();
        self.dirty.clear();
        Ok(written)
    }

    /// Runs `f` on the store read from `dir`, then writes it back.
    ///
    /// Nothing is written unless `f` marked a task dirty. If `f` fails its
    /// error is returned and the write is skipped, discarding any changes
    /// made before the failure.
    pub fn context<T, E, F>(dir: &Path, options: StoreOptions, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut store = Self::read(dir, options.write_cache)?;
        let value = f(&mut store)?;
        store.write(dir, options.backup)?;
        Ok(value)
    }

    // ========== State Transitions ==========

    /// Starts `task` now or at `start_time`. See [`EventStore::start_at`].
    pub fn start(
        &mut self,
        task: &str,
        allow_new: bool,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<&Event, StoreError> {
        self.start_at(task, allow_new, start_time, codec::now())
    }

    /// Starts `task` at `start_time`, or at `now` when none is given.
    ///
    /// Fails, leaving the store untouched, when the name is invalid, the
    /// task is unknown and `allow_new` is not set, any task is running, or
    /// an explicit start time is earlier than the end of the task's latest
    /// event.
    pub fn start_at(
        &mut self,
        task: &str,
        allow_new: bool,
        start_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<&Event, StoreError> {
        let task = TaskName::new(task)?;

        if !allow_new && !self.events.iter().any(|e| e.task() == &task) {
            return Err(StoreError::TaskNotExist { task });
        }

        if let Some(running) = self.running_event() {
            return Err(StoreError::TaskRunning {
                task: running.task().clone(),
                conflict: RunningConflict::Active {
                    since: running.start(),
                },
            });
        }

        let start = match start_time {
            Some(start) => {
                let start = start.trunc_subsecs(0);
                let previous_end = self
                    .events
                    .iter()
                    .rev()
                    .find(|e| e.task() == &task)
                    .map(Event::end);
                if let Some(previous_end) = previous_end.filter(|end| start < *end) {
                    return Err(StoreError::TaskRunning {
                        task,
                        conflict: RunningConflict::Overlap {
                            start,
                            previous_end,
                        },
                    });
                }
                start
            }
            None => now.trunc_subsecs(0),
        };

        let index = self.events.partition_point(|e| e.start() <= start);
        self.events.insert(index, Event::running(task.clone(), start));
        tracing::debug!(%task, %start, "task started");
        self.dirty.insert(task);
        Ok(&self.events[index])
    }

    /// Stops the running task now. See [`EventStore::stop_at`].
    pub fn stop(&mut self, message: Option<String>, force: bool) -> Result<&Event, StoreError> {
        self.stop_at(message, force, codec::now())
    }

    /// Stops the running task at `now`.
    ///
    /// With `force` and nothing running, the most recent event is amended
    /// instead: its duration is recomputed up to `now` and its message
    /// replaced when one is given. A `now` earlier than the event's start
    /// fails with [`StoreError::Stop`] and leaves the store untouched.
    pub fn stop_at(
        &mut self,
        message: Option<String>,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<&Event, StoreError> {
        let index = match self.running_index() {
            Some(index) => index,
            None if force && !self.events.is_empty() => self.events.len() - 1,
            None => return Err(StoreError::TaskNotRunning),
        };

        let event = &mut self.events[index];
        event.stop_at(message, force, now)?;
        tracing::debug!(task = %event.task(), duration = %event.duration(), "task stopped");
        self.dirty.insert(event.task().clone());
        Ok(&self.events[index])
    }

    // ========== Queries ==========

    /// Events of `task`.
    pub fn for_task(&self, task: &str) -> Self {
        self.filtered(|e| e.task() == task)
    }

    /// Events starting in `year`, optionally narrowed to a month and a day.
    pub fn for_date(&self, year: i32, month: Option<u32>, day: Option<u32>) -> Self {
        self.filtered(|e| {
            let start = e.start();
            start.year() == year
                && month.is_none_or(|month| start.month() == month)
                && day.is_none_or(|day| start.day() == day)
        })
    }

    /// Events starting in ISO 8601 week `week` of `year`.
    ///
    /// Weeks run Monday to Sunday and week 1 is the first week containing a
    /// Thursday. A week that does not exist in `year` matches nothing.
    pub fn for_week(&self, year: i32, week: u32) -> Self {
        let Some(monday) = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon) else {
            return Self::default();
        };
        let from = monday.and_time(NaiveTime::MIN).and_utc();
        self.for_range(from, from + Duration::days(7))
    }

    /// Events starting in the half-open range `[from, to)`.
    pub fn for_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.filtered(|e| from <= e.start() && e.start() < to)
    }

    fn filtered(&self, mut keep: impl FnMut(&Event) -> bool) -> Self {
        Self {
            events: self.events.iter().filter(|e| keep(*e)).cloned().collect(),
            dirty: BTreeSet::new(),
        }
    }

    /// Total duration of all events. Running events count as zero.
    pub fn sum(&self) -> Duration {
        self.events
            .iter()
            .fold(Duration::zero(), |total, e| total + e.duration())
    }

    /// Total duration per task.
    pub fn totals_by_task(&self) -> BTreeMap<TaskName, Duration> {
        let mut totals = BTreeMap::new();
        for event in &self.events {
            *totals
                .entry(event.task().clone())
                .or_insert_with(Duration::zero) += event.duration();
        }
        totals
    }

    /// Sorted, unique task names.
    pub fn tasks(&self) -> Vec<TaskName> {
        self.events
            .iter()
            .map(|e| e.task().clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Name of the running task, if any.
    pub fn running(&self) -> Option<&TaskName> {
        self.running_event().map(Event::task)
    }

    /// The running event, if any.
    ///
    /// In a consistent store this is the last event.
    pub fn running_event(&self) -> Option<&Event> {
        self.running_index().map(|index| &self.events[index])
    }

    fn running_index(&self) -> Option<usize> {
        self.events.iter().rposition(|e| e.is_running().is_some())
    }

    // ========== Accessors ==========

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    /// The event with the latest start.
    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Whether any task needs to be written.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_tasks(&self) -> impl Iterator<Item = &TaskName> {
        self.dirty.iter()
    }
}

impl Index<usize> for EventStore {
    type Output = Event;

    fn index(&self, index: usize) -> &Self::Output {
        &self.events[index]
    }
}

impl<'a> IntoIterator for &'a EventStore {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Lists the task files in `dir`, sorted by task name.
fn task_files(dir: &Path) -> io::Result<Vec<(TaskName, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            tracing::warn!(path = %path.display(), "skipping file with non UTF-8 name");
            continue;
        };
        if let Some(task) = file::task_from_file_name(file_name) {
            files.push((task, path));
        }
    }
    files.sort();
    Ok(files)
}

/// Loads one task from its cache or its file.
fn load_task(
    dir: &Path,
    task: &TaskName,
    path: &Path,
    write_cache: bool,
) -> Result<Vec<Event>, StoreError> {
    let mtime = fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|err| StoreError::io(path, err))?;

    if let Some(events) = cache::load(dir, task, mtime) {
        return Ok(events);
    }

    let events = file::read_events(path, task)?;
    if write_cache {
        cache::save(dir, task, mtime, &events);
    }
    Ok(events)
}
