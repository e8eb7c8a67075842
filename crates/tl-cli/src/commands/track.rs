//! Commands that change what is being tracked: start, stop, switch, run.
//!
//! Each mutation runs inside [`EventStore::context`] while holding the
//! `.current` marker, so a failed command leaves both the task files and a
//! marker that `tl fsck` reports.

use std::io::Write;
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tl_core::{Event, TaskName, codec, format_timestamp};
use tl_store::{CurrentMarker, EventStore};

use super::util::{format_hours, parse_at};
use crate::Config;

/// Runs a store mutation under the marker and returns its result.
fn mutate<T>(
    config: &Config,
    command: &str,
    f: impl FnOnce(&mut EventStore) -> Result<T>,
) -> Result<T> {
    let marker = CurrentMarker::acquire(&config.data_dir, command)?;
    let value = EventStore::context(&config.data_dir, config.store_options(), f)?;
    marker.release()?;
    Ok(value)
}

/// No task was named and the history offers none to fall back on.
#[derive(Debug, Error)]
#[error("no task given and no previous task to {action}")]
pub struct NoPreviousTask {
    pub(crate) action: &'static str,
}

/// The task of the most recent event, for commands given no task name.
fn most_recent_task(store: &EventStore) -> Result<TaskName, NoPreviousTask> {
    store
        .last()
        .map(|event| event.task().clone())
        .ok_or(NoPreviousTask { action: "resume" })
}

/// The most recent task other than the running one.
fn previous_task(store: &EventStore) -> Result<TaskName, NoPreviousTask> {
    let running = store.running();
    store
        .iter()
        .rev()
        .map(Event::task)
        .find(|task| Some(*task) != running)
        .cloned()
        .ok_or(NoPreviousTask {
            action: "switch to",
        })
}

/// Runs the start command.
pub fn start<W: Write>(
    writer: &mut W,
    config: &Config,
    task: Option<&str>,
    allow_new: bool,
    at: Option<&str>,
) -> Result<()> {
    let start_time = parse_at(at)?;

    let event = mutate(config, "start", |store| {
        let task = match task {
            Some(task) => task.to_string(),
            None => most_recent_task(store)?.to_string(),
        };
        Ok(store.start(&task, allow_new, start_time)?.clone())
    })?;

    writeln!(
        writer,
        "Started {} at {}",
        event.task(),
        format_timestamp(event.start())
    )?;
    Ok(())
}

/// Runs the stop command.
pub fn stop<W: Write>(
    writer: &mut W,
    config: &Config,
    message: Option<String>,
    amend: bool,
) -> Result<()> {
    let event = mutate(config, "stop", |store| {
        Ok(store.stop(message, amend)?.clone())
    })?;

    writeln!(
        writer,
        "Stopped {} after {}",
        event.task(),
        format_hours(event.duration())
    )?;
    Ok(())
}

/// Runs the switch command.
///
/// The running task, if any, stops at the same instant the next one starts.
pub fn switch<W: Write>(
    writer: &mut W,
    config: &Config,
    task: Option<&str>,
    message: Option<String>,
    allow_new: bool,
    at: Option<&str>,
) -> Result<()> {
    let at = parse_at(at)?;
    let now = codec::now();

    let (stopped, started) = mutate(config, "switch", |store| {
        let next = match task {
            Some(task) => task.to_string(),
            None => previous_task(store)?.to_string(),
        };
        let stopped = switch_in(store, &next, message, allow_new, at, now)?;
        let started = store.running_event().cloned();
        Ok((stopped, started))
    })?;

    if let Some(stopped) = stopped {
        writeln!(
            writer,
            "Stopped {} after {}",
            stopped.task(),
            format_hours(stopped.duration())
        )?;
    }
    if let Some(started) = started {
        writeln!(
            writer,
            "Started {} at {}",
            started.task(),
            format_timestamp(started.start())
        )?;
    }
    Ok(())
}

/// Stops the running task and starts `next`; returns the stopped event.
///
/// A switch time earlier than the running event's start is refused before
/// anything changes.
fn switch_in(
    store: &mut EventStore,
    next: &str,
    message: Option<String>,
    allow_new: bool,
    at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Option<Event>> {
    let stopped = if store.running().is_some() {
        Some(store.stop_at(message, false, at.unwrap_or(now))?.clone())
    } else {
        None
    };
    store.start_at(next, allow_new, at, now)?;
    Ok(stopped)
}

/// Runs the run command and returns the exit code of the child.
///
/// The task is stopped even when the child cannot be spawned; its message
/// is the command line.
pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    task: &str,
    allow_new: bool,
    command: &[String],
) -> Result<u8> {
    let Some((program, args)) = command.split_first() else {
        bail!("no command given");
    };

    start(writer, config, Some(task), allow_new, None)?;

    tracing::debug!(program, ?args, "running command");
    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("failed to run {program}"));

    stop(writer, config, Some(command.join(" ")), false)?;

    let status = status?;
    Ok(status
        .code()
        .map_or(1, |code| u8::try_from(code).unwrap_or(1)))
}
