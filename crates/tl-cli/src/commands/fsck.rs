//! Fsck command: report problems in the data directory.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tl_core::{codec, format_timestamp};
use tl_store::{CurrentMarker, EventStore, MarkerInfo};

use crate::Config;

/// Runs the fsck command and returns the number of warnings, capped at 255.
///
/// Prints nothing when the directory is clean.
pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<u8> {
    let marker = CurrentMarker::inspect(&config.data_dir)?;
    let store = EventStore::read(&config.data_dir, config.cache)?;
    let warnings = render(writer, &store, marker.as_ref(), codec::now())?;
    tracing::debug!(warnings, "fsck finished");
    Ok(u8::try_from(warnings).unwrap_or(u8::MAX))
}

/// Writes one line per problem and returns how many were written.
pub fn render<W: Write>(
    writer: &mut W,
    store: &EventStore,
    marker: Option<&MarkerInfo>,
    now: DateTime<Utc>,
) -> Result<usize> {
    let mut warnings = 0;

    if let Some(marker) = marker {
        match marker.since {
            Some(since) => writeln!(
                writer,
                "interrupted: {} at {} did not finish",
                marker.command,
                format_timestamp(since)
            )?,
            None => writeln!(writer, "interrupted: {} did not finish", marker.command)?,
        }
        warnings += 1;
    }

    for problem in store.consistency_check_at(now) {
        writeln!(writer, "{problem}")?;
        warnings += 1;
    }

    Ok(warnings)
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

    fn event(name: &str, start: DateTime<Utc>, minutes: i64) -> Event {
        Event::from_parts(
            TaskName::new(name).unwrap(),
            start,
            Duration::minutes(minutes),
            String::new(),
        )
    }

    #[test]
    fn clean_store_prints_nothing() {
        let store = EventStore::from_events(vec![event("a", at(9, 0), 60)]);
        let mut output = Vec::new();
        assert_eq!(render(&mut output, &store, None, at(12, 0)).unwrap(), 0);
        assert!(output.is_empty());
    }

    #[test]
    fn reports_marker_and_inconsistencies() {
        let store = EventStore::from_events(vec![
            event("a", at(9, 0), 60),
            event("b", at(9, 30), 30),
            event("c", at(13, 0), 10),
        ]);
        let marker = MarkerInfo {
            command: "switch".to_string(),
            since: Some(at(11, 0)),
        };

        let mut output = Vec::new();
        let warnings = render(&mut output, &store, Some(&marker), at(12, 0)).unwrap();
        assert_eq!(warnings, 3);
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        interrupted: switch at 2024-01-15T11:00:00Z did not finish
        overlap: a 2024-01-15T09:00:00Z PT01H runs into b 2024-01-15T09:30:00Z
        future start: c 2024-01-15T13:00:00Z
        ");
    }

    #[test]
    fn run_counts_leftover_marker() {
        let temp = tempfile::tempdir().unwrap();
        let marker = CurrentMarker::acquire(temp.path(), "stop").unwrap();
        // Simulate a crash: the marker is never released.
        drop(marker);

        let config = Config {
            data_dir: temp.path().to_path_buf(),
            backup: false,
            cache: true,
        };
        let mut output = Vec::new();
        assert_eq!(run(&mut output, &config).unwrap(), 1);
        assert!(String::from_utf8(output).unwrap().starts_with("interrupted: stop at "));
    }

    #[test]
    fn run_on_missing_directory_is_clean() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: temp.path().join("missing"),
            backup: false,
            cache: true,
        };
        assert_eq!(run(&mut Vec::new(), &config).unwrap(), 0);
    }
}
