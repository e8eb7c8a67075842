//! Status commands: the most recent event and the running task.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tl_core::{codec, format_timestamp};
use tl_store::EventStore;

use super::util::{format_hours, select};
use crate::Config;
use crate::cli::Filter;

/// Runs the last command.
pub fn last<W: Write>(writer: &mut W, config: &Config, filter: &Filter) -> Result<()> {
    let store = EventStore::read(&config.data_dir, config.cache)?;
    let today = codec::now().date_naive();
    render_last(writer, &select(&store, filter, today))
}

/// Writes the details of the most recent event in `store`.
pub fn render_last<W: Write>(writer: &mut W, store: &EventStore) -> Result<()> {
    let Some(event) = store.last() else {
        writeln!(writer, "No events recorded.")?;
        return Ok(());
    };

    writeln!(writer, "task:     {}", event.task())?;
    writeln!(writer, "start:    {}", format_timestamp(event.start()))?;
    if event.is_running().is_some() {
        writeln!(writer, "duration: running")?;
    } else {
        writeln!(writer, "end:      {}", format_timestamp(event.end()))?;
        writeln!(writer, "duration: {}", format_hours(event.duration()))?;
    }
    if !event.message().is_empty() {
        writeln!(writer, "message:  {}", event.message())?;
    }
    Ok(())
}

/// Runs the running command.
pub fn running<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let store = EventStore::read(&config.data_dir, config.cache)?;
    render_running(writer, &store, codec::now())
}

/// Writes the running task and its elapsed time; nothing when idle.
pub fn render_running<W: Write>(
    writer: &mut W,
    store: &EventStore,
    now: DateTime<Utc>,
) -> Result<()> {
    if let Some(event) = store.running_event() {
        writeln!(
            writer,
            "{} {}",
            event.task(),
            format_hours(now - event.start())
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use insta::assert_snapshot;
    use tl_core::{Event, TaskName};

    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    fn event(name: &str, start: DateTime<Utc>, minutes: i64, message: &str) -> Event {
        Event::from_parts(
            TaskName::new(name).unwrap(),
            start,
            Duration::minutes(minutes),
            message.to_string(),
        )
    }

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn last_shows_stopped_event() {
        let store = EventStore::from_events(vec![
            event("email", at(8, 0), 20, ""),
            event("coding", at(9, 0), 95, "wrote the parser"),
        ]);

        assert_snapshot!(output(|w| render_last(w, &store)), @r"
        task:     coding
        start:    2024-01-15T09:00:00Z
        end:      2024-01-15T10:35:00Z
        duration: 1h 35m
        message:  wrote the parser
        ");
    }

    #[test]
    fn last_shows_running_event() {
        let store = EventStore::from_events(vec![event("coding", at(9, 0), 0, "")]);

        assert_snapshot!(output(|w| render_last(w, &store)), @r"
        task:     coding
        start:    2024-01-15T09:00:00Z
        duration: running
        ");
    }

    #[test]
    fn last_on_empty_store() {
        let store = EventStore::new();
        assert_eq!(output(|w| render_last(w, &store)), "No events recorded.\n");
    }

    #[test]
    fn running_prints_task_and_elapsed_time() {
        let store = EventStore::from_events(vec![
            event("email", at(8, 0), 20, ""),
            event("coding", at(9, 0), 0, ""),
        ]);
        assert_eq!(
            output(|w| render_running(w, &store, at(10, 5))),
            "coding 1h 05m\n"
        );
    }

    #[test]
    fn running_prints_nothing_when_idle() {
        let store = EventStore::from_events(vec![event("email", at(8, 0), 20, "")]);
        assert_eq!(output(|w| render_running(w, &store, at(10, 5))), "");
    }
}
