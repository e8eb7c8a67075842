//! Reading and writing per-task CSV files.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tl_core::{Event, TaskName, format_duration, format_timestamp, parse_duration, parse_timestamp};

use crate::StoreError;

/// Extension of task data files.
pub const DATA_EXTENSION: &str = "csv";

/// Header row every task file starts with.
pub const HEADER: [&str; 3] = ["start", "delta", "message"];

/// Returns the data file path for `task` within `dir`.
pub fn data_path(dir: &Path, task: &TaskName) -> PathBuf {
    dir.join(format!("{task}.{DATA_EXTENSION}"))
}

/// Returns the backup path for `task` within `dir`.
pub fn backup_path(dir: &Path, task: &TaskName) -> PathBuf {
    dir.join(format!("{task}.{DATA_EXTENSION}~"))
}

/// Extracts the task name from a data file name, if it is one.
///
/// Hidden files, backups and other extensions yield `None`, as do stems
/// that are not valid task names.
pub fn task_from_file_name(file_name: &str) -> Option<TaskName> {
    if file_name.starts_with('.') {
        return None;
    }
    let stem = file_name.strip_suffix(DATA_EXTENSION)?.strip_suffix('.')?;
    match TaskName::new(stem) {
        Ok(task) => Some(task),
        Err(err) => {
            tracing::warn!(file_name, %err, "skipping file with invalid task name");
            None
        }
    }
}

/// Reads all events of `task` from the file at `path`.
pub fn read_events(path: &Path, task: &TaskName) -> Result<Vec<Event>, StoreError> {
    let file = File::open(path).map_err(|err| StoreError::io(path, err))?;
    read_from(file, path, task)
}

/// Parses task file contents. `path` is only used in error messages.
///
/// A zero-byte file holds no events; anything else must start with
/// [`HEADER`].
pub(crate) fn read_from<R: Read>(
    reader: R,
    path: &Path,
    task: &TaskName,
) -> Result<Vec<Event>, StoreError> {
    let csv_error = |source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = reader.headers().map_err(csv_error)?;
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    if !headers.iter().eq(HEADER) {
        return Err(StoreError::Header {
            path: path.to_path_buf(),
            found: headers.iter().map(str::to_string).collect(),
        });
    }

    let mut events = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let line = record.position().map_or(0, csv::Position::line);
        let parse_error = |source| StoreError::Parse {
            path: path.to_path_buf(),
            line,
            source,
        };

        // An empty start would parse as "now".
        let start = match &record[0] {
            "" => Err(tl_core::ParseError::Timestamp(String::new())),
            text => parse_timestamp(text),
        }
        .map_err(parse_error)?;
        let duration = parse_duration(&record[1]).map_err(parse_error)?;

        events.push(Event::from_parts(
            task.clone(),
            start,
            duration,
            record[2].to_string(),
        ));
    }

    tracing::debug!(path = %path.display(), count = events.len(), "parsed task file");
    Ok(events)
}

/// Writes `events` to `path`, replacing its contents.
pub fn write_events<'a>(
    path: &Path,
    events: impl IntoIterator<Item = &'a Event>,
) -> Result<(), StoreError> {
    let file = File::create(path).map_err(|err| StoreError::io(path, err))?;
    write_to(file, events).map_err(|source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

fn write_to<'a, W: io::Write>(
    writer: W,
    events: impl IntoIterator<Item = &'a Event>,
) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    writer.write_record(HEADER)?;
    for event in events {
        let start = format_timestamp(event.start());
        let delta = format_duration(event.duration());
        writer.write_record([start.as_str(), delta.as_str(), event.message()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;

    fn task() -> TaskName {
        TaskName::new("work").unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    fn parse(contents: &str) -> Result<Vec<Event>, StoreError> {
        read_from(contents.as_bytes(), Path::new("work.csv"), &task())
    }

    fn render(events: &[Event]) -> String {
        let mut out = Vec::new();
        write_to(&mut out, events).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn reads_rows_in_file_order() {
        let events = parse(
            "start,delta,message\n\
             2024-01-15T09:00:00Z,PT01H30M,wrote the parser\n\
             2024-01-15T13:00:00Z,,\n",
        )
        .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].start(), at(9, 0));
        assert_eq!(events[0].duration(), Duration::minutes(90));
        assert_eq!(events[0].message(), "wrote the parser");
        assert_eq!(events[1].is_running(), Some(&task()));
    }

    #[test]
    fn empty_file_has_no_events() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("start,delta,message\n").unwrap().is_empty());
    }

    #[test]
    fn rejects_wrong_header() {
        let err = parse("start,duration,message\n").unwrap_err();
        match err {
            StoreError::Header { found, .. } => {
                assert_eq!(found, ["start", "duration", "message"]);
            }
            other => panic!("expected header error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_rows_with_line_number() {
        let err = parse("start,delta,message\n2024-01-15T09:00:00Z,PT1H,\nnot a time,,\n").unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 3, .. }), "{err:?}");

        let err = parse("start,delta,message\n2024-01-15T09:00:00Z,1 hour,\n").unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 2, .. }), "{err:?}");
    }

    #[test]
    fn rejects_empty_start() {
        let err = parse("start,delta,message\n,PT1H,\n").unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = parse("start,delta,message\n2024-01-15T09:00:00Z,PT1H\n").unwrap_err();
        assert!(matches!(err, StoreError::Csv { .. }), "{err:?}");
        assert!(err.is_domain());
    }

    #[test]
    fn writes_header_and_minimal_quoting() {
        let events = [
            Event::from_parts(task(), at(9, 0), Duration::minutes(90), "plain".into()),
            Event::from_parts(task(), at(11, 0), Duration::seconds(5), "a, b".into()),
            Event::running(task(), at(13, 0)),
        ];

        assert_eq!(
            render(&events),
            "start,delta,message\n\
             2024-01-15T09:00:00Z,PT01H30M,plain\n\
             2024-01-15T11:00:00Z,PT05S,\"a, b\"\n\
             2024-01-15T13:00:00Z,,\n"
        );
    }

    #[test]
    fn written_file_reads_back() {
        let events = vec![
            Event::from_parts(task(), at(9, 0), Duration::minutes(1), "line one\nline two".into()),
            Event::from_parts(task(), at(10, 0), Duration::days(1), "quote \" inside".into()),
        ];
        assert_eq!(parse(&render(&events)).unwrap(), events);
    }

    #[test]
    fn task_from_file_name_filters_non_data_files() {
        assert_eq!(task_from_file_name("work.csv"), Some(task()));
        assert_eq!(
            task_from_file_name("my.project.csv").unwrap().as_str(),
            "my.project"
        );
        assert_eq!(task_from_file_name("work.csv~"), None);
        assert_eq!(task_from_file_name(".current"), None);
        assert_eq!(task_from_file_name(".hidden.csv"), None);
        assert_eq!(task_from_file_name("notes.txt"), None);
        assert_eq!(task_from_file_name(".csv"), None);
        assert_eq!(task_from_file_name("workcsv"), None);
    }

    #[test]
    fn paths_are_named_after_task() {
        let dir = Path::new("/data");
        assert_eq!(data_path(dir, &task()), Path::new("/data/work.csv"));
        assert_eq!(backup_path(dir, &task()), Path::new("/data/work.csv~"));
    }
}
